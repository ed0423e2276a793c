//! FEN reading and writing with strict position vetting.
//!
//! A malformed position from the wire must never crash the engine, so the
//! reader validates everything it can: piece counts, pawn ranks, king
//! adjacency, and that the side not to move is not in check. Castling
//! rights and the en passant square are sanitised against the actual
//! piece placement instead of trusted.

use std::fmt;

use super::geometry::{
    file_of, rank_of, sq_from_str, sq_to_str, Sq, A1, A8, E1, E8, H1, H8, SQ_NONE,
};
use super::state::{
    Board, BKMOVED, BLACK_MOVED, BRA8MOVED, BRH8MOVED, WKMOVED, WRA1MOVED, WRH1MOVED,
};
use super::types::{Color, Kind};

/// Why a FEN string was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN needs at least the placement and side-to-move fields
    TooFewParts { found: usize },
    /// Invalid piece character in the placement field
    InvalidPiece { piece: char },
    /// Placement ran off the board
    BadCoordinates,
    /// Side-to-move field is neither "w" nor "b"
    InvalidSideToMove { found: String },
    /// More than one king, or none, for a side
    WrongKingCount,
    /// The two kings are on adjacent squares
    KingsTouch,
    /// Pawn on rank 1 or 8
    PawnOnBackRank,
    /// More pieces than fit one side's sixteen slots, or more than 8 pawns
    TooManyPieces,
    /// More promoted pieces than missing pawns can explain
    TooManyPromotions,
    /// The side that just moved is still in check
    SideNotToMoveInCheck,
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewParts { found } => {
                write!(f, "FEN needs placement and side to move, found {found} fields")
            }
            FenError::InvalidPiece { piece } => write!(f, "unknown piece '{piece}' in FEN"),
            FenError::BadCoordinates => write!(f, "bad coordinates in FEN placement"),
            FenError::InvalidSideToMove { found } => {
                write!(f, "invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::WrongKingCount => write!(f, "wrong number of kings"),
            FenError::KingsTouch => write!(f, "kings too close"),
            FenError::PawnOnBackRank => write!(f, "pawn on bad rank"),
            FenError::TooManyPieces => write!(f, "too many pieces"),
            FenError::TooManyPromotions => write!(f, "too many promoted pieces"),
            FenError::SideNotToMoveInCheck => write!(f, "side to move giving check"),
        }
    }
}

impl std::error::Error for FenError {}

impl Board {
    /// Parse a FEN string into a fully vetted board with the ply stack
    /// initialised.
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(FenError::TooFewParts { found: fields.len() });
        }

        let mut board = Board::empty();
        let mut rank = 8usize;
        let mut file = 1usize;
        for c in fields[0].chars() {
            match c {
                '/' => {
                    if file != 9 || rank == 1 {
                        return Err(FenError::BadCoordinates);
                    }
                    rank -= 1;
                    file = 1;
                }
                '1'..='8' => {
                    file += c as usize - '0' as usize;
                    if file > 9 {
                        return Err(FenError::BadCoordinates);
                    }
                }
                _ => {
                    let kind = Kind::from_char(c).ok_or(FenError::InvalidPiece { piece: c })?;
                    if file > 8 {
                        return Err(FenError::BadCoordinates);
                    }
                    let sq = 10 + rank * 10 + file;
                    if kind.is_pawn() && (rank == 1 || rank == 8) {
                        return Err(FenError::PawnOnBackRank);
                    }
                    if let (true, Some(color)) = (kind.is_king(), kind.color()) {
                        let head = Board::head(color) as usize;
                        if board.arena[head].kind != Kind::NONE {
                            return Err(FenError::WrongKingCount);
                        }
                    }
                    board.put_piece(kind, sq).map_err(|()| FenError::TooManyPieces)?;
                    file += 1;
                }
            }
        }
        if rank != 1 || file != 9 {
            return Err(FenError::BadCoordinates);
        }

        let white_to_move = match fields[1] {
            "w" => true,
            "b" => false,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };

        board.vet_pieces()?;
        board.rebuild_lists();

        // side to move encoded as "the other side just moved"
        board.gflags = if white_to_move { BLACK_MOVED } else { 0 };
        board.apply_castling_field(fields.get(2).copied().unwrap_or("-"));

        board.en_passant_sq = SQ_NONE;
        if let Some(ep_str) = fields.get(3) {
            if *ep_str != "-" {
                if let Some(ep) = sq_from_str(ep_str.as_bytes()) {
                    board.set_ep_if_plausible(ep, white_to_move);
                }
            }
        }

        board.fifty_moves = fields
            .get(4)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0)
            .min(999);
        let full_moves = fields
            .get(5)
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(1)
            .clamp(1, 9999);
        board.start_moves = (full_moves - 1) * 2 + i32::from(!white_to_move);
        board.game_started_from_0 = board.start_moves == 0 && board.fifty_moves == 0;

        // the opponent of the side to move must not be in check
        let mover = if white_to_move { Color::White } else { Color::Black };
        if board.in_check(mover.opp()) {
            return Err(FenError::SideNotToMoveInCheck);
        }

        board.init_stack();
        Ok(board)
    }

    fn vet_pieces(&self) -> Result<(), FenError> {
        for color in [Color::White, Color::Black] {
            let head = Board::head(color) as usize;
            if self.arena[head].kind == Kind::NONE {
                return Err(FenError::WrongKingCount);
            }
            let mut pawns = 0i32;
            let mut extra = 0i32;
            for slot in &self.arena[head..head + 16] {
                if slot.kind == Kind::NONE || slot.sq == 0 {
                    continue;
                }
                match slot.kind.base() {
                    2 => pawns += 1,
                    3 | 4 => extra += 1, // knights and bishops, 2 each at start
                    5 => extra += 1,     // rooks
                    6 => extra += 1,     // queens
                    _ => {}
                }
            }
            if pawns > 8 {
                return Err(FenError::TooManyPieces);
            }
            // count promotions: every piece beyond the initial seven
            // non-king, non-pawn pieces must come from a missing pawn
            let promoted = (extra - 7).max(0);
            if promoted > 8 - pawns {
                return Err(FenError::TooManyPromotions);
            }
        }

        let wk = self.wking;
        let bk = self.bking;
        let rank_diff = rank_of(wk).abs_diff(rank_of(bk));
        let file_diff = file_of(wk).abs_diff(file_of(bk));
        if rank_diff <= 1 && file_diff <= 1 {
            return Err(FenError::KingsTouch);
        }
        Ok(())
    }

    /// Translate the castling field into has-moved flags, then drop any
    /// right whose king or rook is not actually at home.
    fn apply_castling_field(&mut self, field: &str) {
        let mut flags = WKMOVED | WRA1MOVED | WRH1MOVED | BKMOVED | BRA8MOVED | BRH8MOVED;
        if field != "-" {
            for c in field.chars() {
                match c {
                    'K' => flags &= !(WKMOVED | WRH1MOVED),
                    'Q' => flags &= !(WKMOVED | WRA1MOVED),
                    'k' => flags &= !(BKMOVED | BRH8MOVED),
                    'q' => flags &= !(BKMOVED | BRA8MOVED),
                    _ => {}
                }
            }
        }
        // sanitise against the placement
        if self.wking != E1 {
            flags |= WKMOVED | WRA1MOVED | WRH1MOVED;
        }
        if self.squares[A1] != Kind::WROOK {
            flags |= WRA1MOVED;
        }
        if self.squares[H1] != Kind::WROOK {
            flags |= WRH1MOVED;
        }
        if self.bking != E8 {
            flags |= BKMOVED | BRA8MOVED | BRH8MOVED;
        }
        if self.squares[A8] != Kind::BROOK {
            flags |= BRA8MOVED;
        }
        if self.squares[H8] != Kind::BROOK {
            flags |= BRH8MOVED;
        }
        self.gflags |= flags;
    }

    /// Accept the en passant square only when a double step just happened
    /// and an opposing pawn can actually capture onto the square.
    fn set_ep_if_plausible(&mut self, ep: Sq, white_to_move: bool) {
        let (want_rank, stepper, capturer) = if white_to_move {
            (6usize, Kind::BPAWN, Kind::WPAWN)
        } else {
            (3usize, Kind::WPAWN, Kind::BPAWN)
        };
        if rank_of(ep) != want_rank {
            return;
        }
        let landing = if white_to_move { ep - 10 } else { ep + 10 };
        if self.squares[landing] != stepper {
            return;
        }
        if self.squares[landing - 1] == capturer || self.squares[landing + 1] == capturer {
            self.en_passant_sq = ep;
        }
    }

    /// Serialize the position; round-trip partner of `from_fen`.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut out = String::new();
        for rank in (1..=8).rev() {
            let mut empties = 0;
            for file in 1..=8 {
                let kind = self.squares[10 + rank * 10 + file];
                if kind.is_empty() {
                    empties += 1;
                } else {
                    if empties > 0 {
                        out.push((b'0' + empties) as char);
                        empties = 0;
                    }
                    out.push(kind.to_char());
                }
            }
            if empties > 0 {
                out.push((b'0' + empties) as char);
            }
            if rank > 1 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(if self.side_to_move() == Color::White { 'w' } else { 'b' });
        out.push(' ');

        let mut any_castle = false;
        if self.gflags & (WKMOVED | WRH1MOVED) == 0 {
            out.push('K');
            any_castle = true;
        }
        if self.gflags & (WKMOVED | WRA1MOVED) == 0 {
            out.push('Q');
            any_castle = true;
        }
        if self.gflags & (BKMOVED | BRH8MOVED) == 0 {
            out.push('k');
            any_castle = true;
        }
        if self.gflags & (BKMOVED | BRA8MOVED) == 0 {
            out.push('q');
            any_castle = true;
        }
        if !any_castle {
            out.push('-');
        }

        out.push(' ');
        if self.en_passant_sq == SQ_NONE {
            out.push('-');
        } else {
            out.push_str(&sq_to_str(self.en_passant_sq));
        }

        let full_moves = (self.start_moves + self.mv_stack_p as i32) / 2 + 1;
        out.push_str(&format!(" {} {}", self.fifty_moves, full_moves));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_roundtrip() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.to_fen(), fen);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Board::from_fen("").is_err());
        assert!(Board::from_fen("x w - -").is_err());
        assert!(Board::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err()); // no kings
        assert_eq!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1")
                .unwrap_err(),
            FenError::InvalidSideToMove {
                found: "x".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_pawn_on_back_rank() {
        assert_eq!(
            Board::from_fen("P3k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap_err(),
            FenError::PawnOnBackRank
        );
    }

    #[test]
    fn test_rejects_adjacent_kings() {
        assert_eq!(
            Board::from_fen("8/8/8/8/8/8/8/3Kk3 w - - 0 1").unwrap_err(),
            FenError::KingsTouch
        );
    }

    #[test]
    fn test_rejects_side_not_to_move_in_check() {
        // white to move but the black king is already attacked
        assert_eq!(
            Board::from_fen("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1").unwrap_err(),
            FenError::SideNotToMoveInCheck
        );
    }

    #[test]
    fn test_rejects_two_kings_of_one_color() {
        assert_eq!(
            Board::from_fen("4k3/8/8/8/8/8/8/K3K3 w - - 0 1").unwrap_err(),
            FenError::WrongKingCount
        );
    }

    #[test]
    fn test_castling_rights_sanitised() {
        // rights claimed but the h1 rook is gone
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K3 w KQkq - 0 1").unwrap();
        assert!(board.gflags & WRH1MOVED != 0);
        assert!(board.gflags & WRA1MOVED == 0);
    }

    #[test]
    fn test_ep_square_vetted() {
        // ep square given but no capturer beside the pawn: dropped
        let board =
            Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1")
                .unwrap();
        assert_eq!(board.en_passant_sq, SQ_NONE);
        // with a black pawn on d4 the square stands
        let board =
            Board::from_fen("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 2")
                .unwrap();
        assert_eq!(board.en_passant_sq, 45); // e3
    }

    #[test]
    fn test_halfmove_and_fullmove_parsed() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 57 30").unwrap();
        assert_eq!(board.fifty_moves(), 57);
        assert_eq!(board.start_moves, 58);
    }
}
