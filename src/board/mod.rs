//! Board representation and move logic.
//!
//! A 10x12 mailbox board with per-color piece lists and a ply stack for
//! O(1) unmake. Position and pawn hashes are maintained incrementally.
//!
//! # Example
//! ```
//! use mailbox::board::{Board, Color, MoveList};
//!
//! let mut board = Board::startpos();
//! let mut moves = MoveList::new();
//! board.gen_legal_moves(Color::White, &mut moves);
//! assert_eq!(moves.len(), 20);
//! ```

pub mod geometry;
mod attacks;
mod fen;
mod legality;
mod make_unmake;
mod movegen;
mod state;
mod types;

pub use attacks::CheckList;
pub use fen::FenError;
pub use movegen::{
    OrderingTables, Promotions, MAX_DEPTH_US, MVV_LVA_50_NOK, MVV_LVA_50_OK, MVV_LVA_CHECK,
    MVV_LVA_CSTL_LONG, MVV_LVA_CSTL_SHORT, MVV_LVA_HASH, MVV_LVA_ILLEGAL, MVV_LVA_KILLER_0,
    MVV_LVA_KILLER_1, MVV_LVA_MATE_1, MVV_LVA_PV, MVV_LVA_TACTICAL, MVV_LVA_THREAT, NO_LEVEL,
};
pub use state::{
    Board, INFINITY_SCORE, INF_MATE_1, MATE_CUTOFF, MAX_DEPTH, MAX_PLIES, MAX_QS_DEPTH, MAX_STACK,
    BISHOP_V, KNIGHT_V, PAWN_V, QUEEN_V, ROOK_V,
};
pub use types::{
    compress_move, decompress_move, CMove, Color, Kind, Move, MoveList, Special, CHECKLISTLEN,
    FLAG_NONE, FLAG_PIECE, MAXCAPTMV, MAXMV,
};

pub(crate) use state::{EXCHANGE_VALUE, NIL, PIECE_VALUE};
