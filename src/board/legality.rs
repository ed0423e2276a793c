//! Pseudo-legality of an arbitrary move.
//!
//! Hash-table moves and moves from the wire are untrusted: a key collision
//! or a hostile GUI can deliver any (from, to, flag) triple. This check
//! accepts a move only if the piece on the from-square could geometrically
//! play it in the current position. Leaving the own king in check is not
//! tested here; callers make the move and probe `in_check` as usual.

use super::geometry::{
    file_of, rank_of, Sq, A1, B1, C1, C8, D1, D8, E1, E8, F1, F8, G1, G8, H1, H8,
};
use super::state::{Board, BKMOVED, BRA8MOVED, BRH8MOVED, WKMOVED, WRA1MOVED, WRH1MOVED};
use super::types::{Color, Kind, Move};

impl Board {
    fn slider_path_free(&self, from: Sq, to: Sq, step: isize) -> bool {
        let mut sq = from as isize + step;
        while sq != to as isize {
            if !self.squares[sq as usize].is_empty() {
                return false;
            }
            sq += step;
        }
        true
    }

    fn slider_reaches(&self, from: Sq, to: Sq, diagonal: bool, straight: bool) -> bool {
        let diff = to as isize - from as isize;
        let abs = diff.abs();
        if straight && abs % 10 == 0 {
            return self.slider_path_free(from, to, if diff > 0 { 10 } else { -10 });
        }
        if diagonal && abs % 11 == 0 {
            return self.slider_path_free(from, to, if diff > 0 { 11 } else { -11 });
        }
        if diagonal && abs % 9 == 0 {
            return self.slider_path_free(from, to, if diff > 0 { 9 } else { -9 });
        }
        if straight && rank_of(from) == rank_of(to) {
            return self.slider_path_free(from, to, if diff > 0 { 1 } else { -1 });
        }
        false
    }

    /// Could `mv` be played by `color` from the current position? Safe
    /// against adversarial input; never panics on garbage squares.
    #[must_use]
    pub fn check_move_legality(&self, mv: Move, color: Color) -> bool {
        let from = mv.from_sq();
        let to = mv.to_sq();
        if from >= 120 || to >= 120 {
            return false;
        }

        let target = self.squares[to];
        // own pieces and either king are never capturable targets
        if target.is_piece_of(color) || target.is_king() || target == Kind::FENCE {
            return false;
        }

        let mover = self.squares[from];
        if !mover.is_piece_of(color) {
            return false;
        }

        let diff = to as isize - from as isize;
        match mover.base() {
            6 => self.slider_reaches(from, to, true, true),
            5 => self.slider_reaches(from, to, false, true),
            4 => self.slider_reaches(from, to, true, false),
            3 => matches!(diff.abs(), 8 | 12 | 19 | 21),
            2 => {
                let fwd = match color {
                    Color::White => diff,
                    Color::Black => -diff,
                };
                if fwd == 10 {
                    return target.is_empty();
                }
                if fwd == 9 || fwd == 11 {
                    if !target.is_empty() {
                        return true;
                    }
                    // en passant: demand the full geometry, not just the
                    // square match, so a colliding hash move cannot fake it
                    return to == self.en_passant_sq
                        && file_of(from).abs_diff(file_of(to)) == 1
                        && rank_of(from) == ep_origin_rank(color)
                        && self.squares[behind_ep(to, color)] == Kind::WPAWN.recolor(color.opp());
                }
                if fwd == 20 {
                    let mid = (from as isize + if color == Color::White { 10 } else { -10 }) as usize;
                    return rank_of(from) == pawn_home_rank(color)
                        && target.is_empty()
                        && self.squares[mid].is_empty();
                }
                false
            }
            _ => {
                // king
                if matches!(diff.abs(), 1 | 9 | 10 | 11) {
                    return true;
                }
                if diff.abs() != 2 || !target.is_empty() {
                    return false;
                }
                match color {
                    Color::White => {
                        if self.wking != E1 || from != E1 || self.gflags & WKMOVED != 0 {
                            return false;
                        }
                        if to == G1 {
                            self.squares[F1].is_empty()
                                && self.squares[H1] == Kind::WROOK
                                && self.gflags & WRH1MOVED == 0
                                && !self.in_check(Color::White)
                                && !self.square_attacked_by(F1, Color::Black)
                        } else if to == C1 {
                            self.squares[D1].is_empty()
                                && self.squares[B1].is_empty()
                                && self.squares[A1] == Kind::WROOK
                                && self.gflags & WRA1MOVED == 0
                                && !self.in_check(Color::White)
                                && !self.square_attacked_by(D1, Color::Black)
                        } else {
                            false
                        }
                    }
                    Color::Black => {
                        if self.bking != E8 || from != E8 || self.gflags & BKMOVED != 0 {
                            return false;
                        }
                        if to == G8 {
                            self.squares[F8].is_empty()
                                && self.squares[H8] == Kind::BROOK
                                && self.gflags & BRH8MOVED == 0
                                && !self.in_check(Color::Black)
                                && !self.square_attacked_by(F8, Color::White)
                        } else if to == C8 {
                            self.squares[D8].is_empty()
                                && self.squares[super::geometry::B8].is_empty()
                                && self.squares[super::geometry::A8] == Kind::BROOK
                                && self.gflags & BRA8MOVED == 0
                                && !self.in_check(Color::Black)
                                && !self.square_attacked_by(D8, Color::White)
                        } else {
                            false
                        }
                    }
                }
            }
        }
    }
}

fn pawn_home_rank(color: Color) -> usize {
    match color {
        Color::White => 2,
        Color::Black => 7,
    }
}

fn ep_origin_rank(color: Color) -> usize {
    match color {
        Color::White => 5,
        Color::Black => 4,
    }
}

/// Square of the pawn that double-stepped, given the en passant target.
fn behind_ep(ep: Sq, capturing: Color) -> Sq {
    match capturing {
        Color::White => ep - 10,
        Color::Black => ep + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::FLAG_PIECE;

    fn mv(from: Sq, to: Sq, flag: u8) -> Move {
        Move::new(from, to, flag, 0)
    }

    #[test]
    fn test_generated_moves_all_pass() {
        let mut board = Board::startpos();
        let mut list = super::super::types::MoveList::new();
        board.gen_legal_moves(Color::White, &mut list);
        for m in list.iter() {
            assert!(board.check_move_legality(*m, Color::White), "{}", m.to_uci());
        }
    }

    #[test]
    fn test_rejects_blocked_slider() {
        let board = Board::startpos();
        // a1a3 jumps over the a2 pawn
        assert!(!board.check_move_legality(mv(A1, 41, FLAG_PIECE), Color::White));
    }

    #[test]
    fn test_rejects_wrong_side_and_king_capture() {
        let board = Board::startpos();
        // moving a black piece as white
        assert!(!board.check_move_legality(mv(95, 85, FLAG_PIECE), Color::White));
        // no move may land on a king square
        let board =
            Board::from_fen("4k3/8/8/8/8/8/4R3/4K3 b - - 0 1").unwrap();
        assert!(!board.check_move_legality(mv(35, 95, FLAG_PIECE), Color::White));
    }

    #[test]
    fn test_ep_branch_requires_true_geometry() {
        let mut board =
            Board::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
                .unwrap();
        let e5 = 65;
        let f6 = 76;
        // the real en passant capture passes
        assert!(board.check_move_legality(mv(e5, f6, Kind::WPAWN.0 as u8), Color::White));
        // a fabricated "pawn move" onto the ep square from the wrong rank fails
        let e2 = 35;
        assert!(!board.check_move_legality(mv(e2, f6, Kind::WPAWN.0 as u8), Color::White));
        // and the branch insists on the double-stepped pawn behind the square
        board.en_passant_sq = 75; // e6, but no black pawn on e5 double-stepped
        assert!(!board.check_move_legality(mv(e5 + 1, 75, Kind::WPAWN.0 as u8), Color::White));
    }

    #[test]
    fn test_castling_legality_checked() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert!(board.check_move_legality(mv(E1, G1, FLAG_PIECE), Color::White));
        assert!(board.check_move_legality(mv(E1, C1, FLAG_PIECE), Color::White));
        // transit square attacked
        let board = Board::from_fen("5r1k/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(!board.check_move_legality(mv(E1, G1, FLAG_PIECE), Color::White));
        assert!(board.check_move_legality(mv(E1, C1, FLAG_PIECE), Color::White));
    }
}
