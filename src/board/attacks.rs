//! In-check detection.
//!
//! `in_check` is the boolean fast path used after every make. `in_check_info`
//! enumerates the checking pieces plus, for sliders, the empty squares of the
//! checking ray; the evasion generator uses those squares as blocker targets.
//! Two distinct checkers end the enumeration early since only king moves can
//! answer a double check.

use super::geometry::{Sq, BISHOP_OFFSETS, KNIGHT_OFFSETS, ROOK_OFFSETS};
use super::state::Board;
use super::types::{Color, Kind, CHECKLISTLEN};

/// Checker squares and slider-ray squares for evasion generation.
pub struct CheckList {
    pub squares: [u8; CHECKLISTLEN],
    pub len: usize,
    /// Number of distinct checking pieces (1 or 2).
    pub pieces: usize,
}

impl CheckList {
    #[must_use]
    pub fn new() -> CheckList {
        CheckList {
            squares: [0; CHECKLISTLEN],
            len: 0,
            pieces: 0,
        }
    }

    #[inline]
    fn push(&mut self, sq: Sq) {
        if self.len < CHECKLISTLEN {
            self.squares[self.len] = sq as u8;
            self.len += 1;
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, sq: Sq) -> bool {
        self.squares[..self.len].iter().any(|&s| s as Sq == sq)
    }
}

impl Default for CheckList {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Is `color`'s king attacked right now?
    #[must_use]
    pub fn in_check(&self, color: Color) -> bool {
        self.square_attacked_by(self.king_sq(color), color.opp())
    }

    /// Is `sq` attacked by any piece of `by`? Own pieces block rays, which
    /// matches how the castling transit test uses this.
    #[must_use]
    pub(crate) fn square_attacked_by(&self, sq: Sq, by: Color) -> bool {
        let pawn = Kind::WPAWN.recolor(by);
        let knight = Kind::WKNIGHT.recolor(by);
        let bishop = Kind::WBISHOP.recolor(by);
        let rook = Kind::WROOK.recolor(by);
        let queen = Kind::WQUEEN.recolor(by);
        let king = Kind::WKING.recolor(by);

        // pawns attack towards their own movement direction
        let pawn_probe: [isize; 2] = match by {
            Color::White => [-9, -11],
            Color::Black => [9, 11],
        };
        for off in pawn_probe {
            if self.squares[(sq as isize + off) as usize] == pawn {
                return true;
            }
        }

        for off in KNIGHT_OFFSETS {
            if self.squares[(sq as isize + off) as usize] == knight {
                return true;
            }
        }

        for off in ROOK_OFFSETS {
            let mut probe = sq as isize + off;
            loop {
                let kind = self.squares[probe as usize];
                if kind == rook || kind == queen {
                    return true;
                }
                if kind == king && probe == sq as isize + off {
                    return true;
                }
                if !kind.is_empty() {
                    break;
                }
                probe += off;
            }
        }

        for off in BISHOP_OFFSETS {
            let mut probe = sq as isize + off;
            loop {
                let kind = self.squares[probe as usize];
                if kind == bishop || kind == queen {
                    return true;
                }
                if kind == king && probe == sq as isize + off {
                    return true;
                }
                if !kind.is_empty() {
                    break;
                }
                probe += off;
            }
        }

        false
    }

    /// Full check enumeration for `color`'s king. Returns the number of
    /// checking pieces; `out` receives the attacker squares and, for each
    /// checking slider, the empty squares between it and the king.
    #[must_use]
    pub fn in_check_info(&self, color: Color, out: &mut CheckList) -> usize {
        out.len = 0;
        out.pieces = 0;

        let king_sq = self.king_sq(color);
        let opp = color.opp();
        let pawn = Kind::WPAWN.recolor(opp);
        let knight = Kind::WKNIGHT.recolor(opp);
        let bishop = Kind::WBISHOP.recolor(opp);
        let rook = Kind::WROOK.recolor(opp);
        let queen = Kind::WQUEEN.recolor(opp);

        let pawn_probe: [isize; 2] = match color {
            Color::White => [9, 11],
            Color::Black => [-9, -11],
        };
        for off in pawn_probe {
            let sq = (king_sq as isize + off) as usize;
            if self.squares[sq] == pawn {
                out.push(sq);
                out.pieces += 1;
            }
        }

        for off in KNIGHT_OFFSETS {
            let sq = (king_sq as isize + off) as usize;
            if self.squares[sq] == knight {
                out.push(sq);
                out.pieces += 1;
            }
        }

        // a pawn and a knight can both check after an underpromotion capture,
        // but two short-range checkers already end the search for sliders
        if out.pieces > 1 {
            return out.pieces;
        }

        let mut ray = |offsets: [isize; 4], slider: Kind| -> bool {
            for off in offsets {
                let mut line: [u8; 8] = [0; 8];
                let mut line_len = 0;
                let mut probe = king_sq as isize + off;
                loop {
                    let kind = self.squares[probe as usize];
                    if kind.is_empty() {
                        line[line_len] = probe as u8;
                        line_len += 1;
                        probe += off;
                        continue;
                    }
                    if kind == slider || kind == queen {
                        for &sq in &line[..line_len] {
                            out.push(sq as Sq);
                        }
                        out.push(probe as Sq);
                        out.pieces += 1;
                        if out.pieces > 1 {
                            return true;
                        }
                    }
                    break;
                }
            }
            false
        };

        if ray(BISHOP_OFFSETS, bishop) {
            return out.pieces;
        }
        let _ = ray(ROOK_OFFSETS, rook);
        out.pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::state::Board;

    #[test]
    fn test_no_check_at_startpos() {
        let board = Board::startpos();
        assert!(!board.in_check(Color::White));
        assert!(!board.in_check(Color::Black));
    }

    #[test]
    fn test_pawn_check() {
        let board = Board::from_fen("8/8/8/8/8/5p2/4K3/7k w - - 0 1").unwrap();
        assert!(board.in_check(Color::White));
    }

    #[test]
    fn test_knight_check() {
        let board = Board::from_fen("8/8/8/8/3n4/8/4K3/7k w - - 0 1").unwrap();
        assert!(board.in_check(Color::White));
    }

    #[test]
    fn test_slider_check_blocked() {
        let board = Board::from_fen("4r3/8/4N3/8/8/8/4K3/7k w - - 0 1").unwrap();
        assert!(!board.in_check(Color::White));
        let board = Board::from_fen("4r3/8/8/8/8/8/4K3/7k w - - 0 1").unwrap();
        assert!(board.in_check(Color::White));
    }

    #[test]
    fn test_check_info_single_slider_lists_ray() {
        let board = Board::from_fen("4r3/8/8/8/8/8/4K3/7k w - - 0 1").unwrap();
        let mut list = CheckList::new();
        let pieces = board.in_check_info(Color::White, &mut list);
        assert_eq!(pieces, 1);
        // rook on e8, king on e2: five empty ray squares plus the rook
        assert_eq!(list.len, 6);
        assert!(list.contains(crate::board::geometry::E8));
    }

    #[test]
    fn test_double_check_early_exit() {
        // rook on e8 and bishop on h5 both check the e2 king
        let board = Board::from_fen("4r3/8/8/7b/8/8/4K3/7k w - - 0 1").unwrap();
        let mut list = CheckList::new();
        let pieces = board.in_check_info(Color::White, &mut list);
        assert_eq!(pieces, 2);
    }

    #[test]
    fn test_kings_adjacent_detected() {
        let board = Board::from_fen("8/8/8/8/8/8/4Kk2/8 w - - 0 1");
        // the FEN reader refuses adjacent kings outright
        assert!(board.is_err());
    }
}
