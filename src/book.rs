//! Compiled-in opening book.
//!
//! A handful of main lines, replayed once from the starting position into
//! a hash-keyed table. Lookup returns up to twelve candidate moves for
//! the current position; the worker picks one at random. Black's replies
//! come from the same lines, so the book works for either color.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::board::{compress_move, decompress_move, Board, CMove, Move};
use crate::uci::command::parse_move;

/// At most this many candidates are returned for one position.
pub const MAX_BOOK_MATCH: usize = 12;

/// Main lines in wire notation. Every move must be legal in sequence;
/// the table builder asserts that in debug builds and skips the rest of
/// a line otherwise.
static BOOK_LINES: &[&str] = &[
    // open games
    "e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7 f1e1 b7b5 a4b3 d7d6 c2c3 e8g8",
    "e2e4 e7e5 g1f3 b8c6 f1b5 g8f6 e1g1 f6e4 d2d4 e4d6 b5c6 d7c6 d4e5 d6f5",
    "e2e4 e7e5 g1f3 b8c6 f1c4 f8c5 c2c3 g8f6 d2d3 d7d6 e1g1 e8g8",
    "e2e4 e7e5 g1f3 g8f6 f3e5 d7d6 e5f3 f6e4 d2d4 d6d5 f1d3 f8e7",
    // sicilians
    "e2e4 c7c5 g1f3 d7d6 d2d4 c5d4 f3d4 g8f6 b1c3 a7a6 f1e2 e7e5 d4b3 f8e7",
    "e2e4 c7c5 g1f3 b8c6 d2d4 c5d4 f3d4 g8f6 b1c3 e7e5 d4b5 d7d6",
    "e2e4 c7c5 g1f3 e7e6 d2d4 c5d4 f3d4 b8c6 d4b5 d7d6 c2c4 g8f6",
    // french and caro-kann
    "e2e4 e7e6 d2d4 d7d5 b1c3 g8f6 c1g5 f8e7 e4e5 f6d7 g5e7 d8e7",
    "e2e4 e7e6 d2d4 d7d5 e4e5 c7c5 c2c3 b8c6 g1f3 d8b6",
    "e2e4 c7c6 d2d4 d7d5 b1c3 d5e4 c3e4 c8f5 e4g3 f5g6 h2h4 h7h6",
    // pirc
    "e2e4 g7g6 d2d4 f8g7 b1c3 d7d6 f2f4 g8f6 g1f3 e8g8 f1d3",
    // queen's gambit family
    "d2d4 d7d5 c2c4 e7e6 b1c3 g8f6 c1g5 f8e7 e2e3 e8g8 g1f3 h7h6 g5h4 b7b6",
    "d2d4 d7d5 c2c4 c7c6 g1f3 g8f6 b1c3 e7e6 e2e3 b8d7 f1d3 d5c4 d3c4 b7b5",
    "d2d4 d7d5 c2c4 d5c4 g1f3 g8f6 e2e3 e7e6 f1c4 c7c5 e1g1 a7a6",
    "d2d4 d7d5 g1f3 g8f6 c2c4 e7e6 g2g3 f8e7 f1g2 e8g8 e1g1 d5c4",
    // indian defences
    "d2d4 g8f6 c2c4 e7e6 b1c3 f8b4 e2e3 e8g8 f1d3 d7d5 g1f3 c7c5",
    "d2d4 g8f6 c2c4 e7e6 g1f3 b7b6 g2g3 c8b7 f1g2 f8e7 e1g1 e8g8",
    "d2d4 g8f6 c2c4 g7g6 b1c3 f8g7 e2e4 d7d6 g1f3 e8g8 f1e2 e7e5 e1g1 b8c6",
    "d2d4 g8f6 c2c4 g7g6 b1c3 d7d5 c4d5 f6d5 e2e4 d5c3 b2c3 f8g7",
    // flank openings
    "c2c4 e7e5 b1c3 g8f6 g1f3 b8c6 g2g3 d7d5 c4d5 f6d5 f1g2 d5b6",
    "c2c4 c7c5 g1f3 g8f6 g2g3 d7d5 c4d5 f6d5 f1g2 b8c6 e1g1 e7e5",
    "g1f3 g8f6 c2c4 g7g6 b1c3 f8g7 d2d4 e8g8 e2e4 d7d6 f1e2 e7e5",
    "g1f3 d7d5 g2g3 g8f6 f1g2 e7e6 e1g1 f8e7 d2d4 e8g8 c2c4 d5c4",
];

struct Book {
    positions: HashMap<u64, Vec<CMove>>,
}

fn build_book() -> Book {
    let mut positions: HashMap<u64, Vec<CMove>> = HashMap::new();
    for line in BOOK_LINES {
        let mut board = Board::startpos();
        for token in line.split_whitespace() {
            let Some(mv) = parse_move(&mut board, token) else {
                debug_assert!(false, "illegal book move {token} in '{line}'");
                break;
            };
            let entry = positions.entry(board.pos_hash()).or_default();
            let cmove = compress_move(mv);
            if !entry.contains(&cmove) && entry.len() < MAX_BOOK_MATCH {
                entry.push(cmove);
            }
            board.update_fifty_for(mv);
            board.push_status();
            board.make_move(mv);
        }
    }
    Book { positions }
}

static BOOK: Lazy<Book> = Lazy::new(build_book);

/// Book candidates for the current position, re-validated against the
/// board; empty when out of book.
#[must_use]
pub fn candidates(board: &mut Board) -> Vec<Move> {
    let Some(cmoves) = BOOK.positions.get(&board.pos_hash()) else {
        return Vec::new();
    };
    let color = board.side_to_move();
    let mut out = Vec::new();
    for &cmove in cmoves.iter().take(MAX_BOOK_MATCH) {
        let mv = decompress_move(cmove);
        if board.check_move_legality(mv, color) {
            board.push_status();
            board.make_move(mv);
            let legal = !board.in_check(color);
            board.retract_last_move();
            board.pop_status();
            if legal {
                out.push(mv);
            }
        }
    }
    out
}

/// Wire string of the current candidates, for the `Book Moves` button.
#[must_use]
pub fn line_string(board: &mut Board) -> String {
    let moves = candidates(board);
    if moves.is_empty() {
        return "out of book".to_string();
    }
    moves
        .iter()
        .map(|m| m.to_uci())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_book_lines_are_legal() {
        // the builder debug-asserts per move; force it and count entries
        let book = build_book();
        assert!(book.positions.len() > 50);
    }

    #[test]
    fn test_startpos_has_candidates() {
        let mut board = Board::startpos();
        let moves = candidates(&mut board);
        assert!(!moves.is_empty());
        assert!(moves.len() <= MAX_BOOK_MATCH);
        // e2e4 and d2d4 are both first moves of lines
        let ucis: Vec<String> = moves.iter().map(|m| m.to_uci()).collect();
        assert!(ucis.contains(&"e2e4".to_string()));
        assert!(ucis.contains(&"d2d4".to_string()));
    }

    #[test]
    fn test_reply_position_found() {
        let mut board = Board::startpos();
        let e4 = parse_move(&mut board, "e2e4").unwrap();
        board.update_fifty_for(e4);
        board.push_status();
        board.make_move(e4);
        let replies = candidates(&mut board);
        let ucis: Vec<String> = replies.iter().map(|m| m.to_uci()).collect();
        assert!(ucis.contains(&"e7e5".to_string()));
        assert!(ucis.contains(&"c7c5".to_string()));
    }

    #[test]
    fn test_out_of_book_is_empty() {
        let mut board =
            Board::from_fen("rnbqkbnr/pppppppp/8/8/7P/8/PPPPPPP1/RNBQKBNR b KQkq - 0 1").unwrap();
        assert!(candidates(&mut board).is_empty());
        assert_eq!(line_string(&mut board), "out of book");
    }
}
