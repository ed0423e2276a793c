//! Zobrist hashing for board positions.
//!
//! Two 64-bit keys are maintained per position: the full position hash and
//! a pawns-only hash for the pawn evaluation cache. Keys are indexed by
//! (piece kind, mailbox square); the en passant file uses a per-square key.
//! The castling-rights and side-to-move bits of the game flags are XORed
//! into the position hash directly; the "has castled" bits are deliberately
//! left out, so two positions differing only in castling history share a key.

use once_cell::sync::Lazy;
use rand::prelude::*;

use crate::board::geometry::BOARD_SLOTS;

/// Fixed seed so that hash keys reproduce across runs.
const ZOBRIST_SEED: u64 = 3571;

pub(crate) struct ZobristKeys {
    /// piece_keys[kind][mailbox square]; rows 0 and 1 stay zero.
    pub(crate) piece_keys: [[u64; BOARD_SLOTS]; 18],
    /// en_passant_keys[square 0..63]
    pub(crate) en_passant_keys: [u64; 64],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut piece_keys = [[0u64; BOARD_SLOTS]; 18];
        let mut en_passant_keys = [0u64; 64];

        for kind in piece_keys.iter_mut().skip(2) {
            for key in kind.iter_mut() {
                *key = rng.gen();
            }
        }
        for key in &mut en_passant_keys {
            *key = rng.gen();
        }

        ZobristKeys {
            piece_keys,
            en_passant_keys,
        }
    }
}

pub(crate) static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);
