//! Static evaluation.
//!
//! The search consumes a score from the side to move's view plus three
//! side-band facts: a material ordinal that is 0 for dead-draw material
//! and otherwise gates null move and reductions, an endgame flag, and the
//! per-side masks of files with passed pawns (they drive the pawn-race
//! extension). Pawn structure terms are cached in the pawn hash table;
//! everything else is recomputed per call. The weights here are tuning
//! material, not a contract.

use crate::board::geometry::{file_of, rank_of, to_64, Sq};
use crate::board::{Board, Color, BISHOP_V, KNIGHT_V, PAWN_V, QUEEN_V, ROOK_V};
use crate::kpk;
use crate::pawn_hash::{PawnEntry, PawnTable, RookFiles};

/// Material ordinal thresholds used by the search.
pub const EG_PIECES: i32 = 6;
pub const NULL_PIECES: i32 = 6;

/// Everything the search wants to know about a position at rest.
#[derive(Clone, Copy, Debug)]
pub struct EvalResult {
    /// Centipawns, positive = advantage for the queried side.
    pub score: i32,
    /// 0 for dead-draw material, else a monotone piece-activity ordinal.
    pub material_enough: i32,
    pub is_endgame: bool,
    /// Files holding passed white pawns, LSB = a-file. Only meaningful
    /// when `is_endgame` is set.
    pub w_passed: u8,
    pub b_passed: u8,
}

/// The evaluator owns the pawn-structure cache and the tablebase-hit
/// counter reported on the UCI wire.
pub struct Evaluator {
    pawn_table: PawnTable,
    pub tb_hits: u64,
}

// piece-square tables, white view, a1 = index 0
#[rustfmt::skip]
static PAWN_PST_MG: [i16; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
      2,   4,   4, -12, -12,   4,   4,   2,
      2,  -2,  -4,   2,   2,  -4,  -2,   2,
      0,   0,   6,  16,  16,   6,   0,   0,
      4,   6,  12,  20,  20,  12,   6,   4,
     10,  14,  20,  24,  24,  20,  14,  10,
     30,  34,  38,  42,  42,  38,  34,  30,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
static PAWN_PST_EG: [i16; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
      4,   4,   4,   4,   4,   4,   4,   4,
      6,   6,   6,   6,   6,   6,   6,   6,
     12,  12,  12,  12,  12,  12,  12,  12,
     24,  24,  24,  24,  24,  24,  24,  24,
     42,  42,  42,  42,  42,  42,  42,  42,
     70,  70,  70,  70,  70,  70,  70,  70,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
static KNIGHT_PST: [i16; 64] = [
    -30, -20, -12,  -8,  -8, -12, -20, -30,
    -16,  -8,   0,   4,   4,   0,  -8, -16,
     -8,   4,  10,  14,  14,  10,   4,  -8,
     -6,   6,  14,  20,  20,  14,   6,  -6,
     -6,   6,  14,  20,  20,  14,   6,  -6,
     -8,   4,  10,  14,  14,  10,   4,  -8,
    -16,  -8,   0,   4,   4,   0,  -8, -16,
    -30, -20, -12,  -8,  -8, -12, -20, -30,
];

#[rustfmt::skip]
static BISHOP_PST: [i16; 64] = [
    -12,  -8,  -6,  -4,  -4,  -6,  -8, -12,
     -4,   6,   2,   4,   4,   2,   6,  -4,
     -2,   2,   8,   8,   8,   8,   2,  -2,
      0,   6,   8,  12,  12,   8,   6,   0,
      0,   6,   8,  12,  12,   8,   6,   0,
     -2,   2,   8,   8,   8,   8,   2,  -2,
     -4,   0,   2,   4,   4,   2,   0,  -4,
    -12,  -8,  -6,  -4,  -4,  -6,  -8, -12,
];

#[rustfmt::skip]
static ROOK_PST: [i16; 64] = [
      0,   0,   4,   8,   8,   4,   0,   0,
     -4,   0,   0,   4,   4,   0,   0,  -4,
     -4,   0,   0,   4,   4,   0,   0,  -4,
     -4,   0,   0,   4,   4,   0,   0,  -4,
     -4,   0,   0,   4,   4,   0,   0,  -4,
     -4,   0,   0,   4,   4,   0,   0,  -4,
     12,  16,  16,  16,  16,  16,  16,  12,
      4,   4,   8,   8,   8,   8,   4,   4,
];

#[rustfmt::skip]
static QUEEN_PST: [i16; 64] = [
     -8,  -4,  -4,   0,   0,  -4,  -4,  -8,
     -4,   0,   2,   2,   2,   2,   0,  -4,
     -4,   2,   4,   4,   4,   4,   2,  -4,
      0,   2,   4,   6,   6,   4,   2,   0,
      0,   2,   4,   6,   6,   4,   2,   0,
     -4,   2,   4,   4,   4,   4,   2,  -4,
     -4,   0,   2,   2,   2,   2,   0,  -4,
     -8,  -4,  -4,   0,   0,  -4,  -4,  -8,
];

#[rustfmt::skip]
static KING_PST_MG: [i16; 64] = [
     24,  30,  16,   0,   0,  10,  32,  26,
     16,  16,   2,  -8,  -8,   2,  16,  16,
    -10, -14, -18, -22, -22, -18, -14, -10,
    -22, -26, -30, -36, -36, -30, -26, -22,
    -30, -34, -38, -44, -44, -38, -34, -30,
    -34, -38, -42, -48, -48, -42, -38, -34,
    -38, -42, -46, -50, -50, -46, -42, -38,
    -42, -46, -50, -54, -54, -50, -46, -42,
];

#[rustfmt::skip]
static KING_PST_EG: [i16; 64] = [
    -40, -26, -18, -12, -12, -18, -26, -40,
    -24, -10,  -2,   4,   4,  -2, -10, -24,
    -16,   0,  12,  18,  18,  12,   0, -16,
    -10,   6,  18,  26,  26,  18,   6, -10,
    -10,   6,  18,  26,  26,  18,   6, -10,
    -16,   0,  12,  18,  18,  12,   0, -16,
    -24, -10,  -2,   4,   4,  -2, -10, -24,
    -40, -26, -18, -12, -12, -18, -26, -40,
];

/// Bonus for a passed pawn by its rank seen from the owning side.
static PASSED_BONUS: [i32; 8] = [0, 8, 12, 20, 34, 56, 90, 0];

const TEMPO: i32 = 10;
const ENDGAME_NPM_LIMIT: i32 = 2 * (ROOK_V + BISHOP_V);
const KPK_WIN_BONUS: i32 = 700;

#[derive(Default)]
struct SideTally {
    pawns: i32,
    knights: i32,
    bishops: i32,
    rooks: i32,
    queens: i32,
    /// non-pawn material
    npm: i32,
    pst_mg: i32,
    pst_eg: i32,
    mobility: i32,
    bishop_colors: u8, // bit 0 light, bit 1 dark
    pawn_sqs: [u8; 8],
    pawn_count: usize,
    lone_pawn_sq: usize,
}

impl Evaluator {
    #[must_use]
    pub fn new() -> Evaluator {
        Evaluator {
            pawn_table: PawnTable::new(),
            tb_hits: 0,
        }
    }

    /// Forget cached pawn structure, e.g. on `ucinewgame`.
    pub fn clear_cache(&mut self) {
        self.pawn_table.clear();
    }

    /// Evaluate the current position from `side`'s view.
    #[must_use]
    pub fn evaluate(&mut self, board: &Board, side: Color) -> EvalResult {
        let mut tally = [SideTally::default(), SideTally::default()];
        for color in [Color::White, Color::Black] {
            self.tally_side(board, color, &mut tally[color.index()]);
        }
        let (w, b) = {
            let [w, b] = &tally;
            (w, b)
        };

        let material_enough = material_ordinal(w, b);
        let is_endgame = w.npm + b.npm <= ENDGAME_NPM_LIMIT;

        if material_enough == 0 {
            return EvalResult {
                score: 0,
                material_enough,
                is_endgame,
                w_passed: 0,
                b_passed: 0,
            };
        }

        // KPK: a single pawn decides everything, ask the probe
        if let Some(result) = self.probe_kpk(board, side, w, b, is_endgame) {
            return result;
        }

        let (pawns, rooks_files) = self.pawn_structure(board, is_endgame, w, b);

        let mut score = board.material();

        // blend the piece-square sums over the game phase
        let phase_max = 2 * ENDGAME_NPM_LIMIT;
        let phase = (w.npm + b.npm).min(phase_max);
        let mg = w.pst_mg - b.pst_mg;
        let eg = w.pst_eg - b.pst_eg;
        score += (mg * phase + eg * (phase_max - phase)) / phase_max;

        score += pawns.value;
        score += 2 * (w.mobility - b.mobility);
        score += rook_file_score(board, Color::White, rooks_files)
            - rook_file_score(board, Color::Black, rooks_files);

        // passed pawns push harder in the endgame
        if is_endgame {
            score += passed_run_bonus(w, pawns.w_passed, Color::White)
                - passed_run_bonus(b, pawns.b_passed, Color::Black);
        }

        // the bishop pair keeps its value into simple positions
        if w.bishop_colors == 3 {
            score += 30;
        }
        if b.bishop_colors == 3 {
            score -= 30;
        }

        score += match side {
            Color::White => TEMPO,
            Color::Black => -TEMPO,
        };

        if side == Color::Black {
            score = -score;
        }

        EvalResult {
            score,
            material_enough,
            is_endgame,
            w_passed: pawns.w_passed,
            b_passed: pawns.b_passed,
        }
    }

    fn tally_side(&self, board: &Board, color: Color, out: &mut SideTally) {
        let mut idx = Board::head(color);
        while idx != crate::board::NIL {
            let slot = &board.arena[idx as usize];
            let sq = slot.sq as Sq;
            let sq64 = to_64(sq);
            let pst_idx = match color {
                Color::White => sq64,
                Color::Black => sq64 ^ 56,
            };
            match slot.kind.base() {
                2 => {
                    out.pawns += 1;
                    out.pst_mg += i32::from(PAWN_PST_MG[pst_idx]);
                    out.pst_eg += i32::from(PAWN_PST_EG[pst_idx]);
                    if out.pawn_count < 8 {
                        out.pawn_sqs[out.pawn_count] = sq as u8;
                        out.pawn_count += 1;
                    }
                    out.lone_pawn_sq = sq;
                }
                3 => {
                    out.knights += 1;
                    out.npm += KNIGHT_V;
                    let pst = i32::from(KNIGHT_PST[pst_idx]);
                    out.pst_mg += pst;
                    out.pst_eg += pst;
                    out.mobility += i32::from(slot.mobility);
                }
                4 => {
                    out.bishops += 1;
                    out.npm += BISHOP_V;
                    let pst = i32::from(BISHOP_PST[pst_idx]);
                    out.pst_mg += pst;
                    out.pst_eg += pst;
                    out.mobility += i32::from(slot.mobility);
                    out.bishop_colors |= if (rank_of(sq) + file_of(sq)) % 2 == 0 {
                        2
                    } else {
                        1
                    };
                }
                5 => {
                    out.rooks += 1;
                    out.npm += ROOK_V;
                    let pst = i32::from(ROOK_PST[pst_idx]);
                    out.pst_mg += pst;
                    out.pst_eg += pst;
                    out.mobility += i32::from(slot.mobility);
                }
                6 => {
                    out.queens += 1;
                    out.npm += QUEEN_V;
                    let pst = i32::from(QUEEN_PST[pst_idx]);
                    out.pst_mg += pst;
                    out.pst_eg += pst;
                    out.mobility += i32::from(slot.mobility);
                }
                _ => {
                    out.pst_mg += i32::from(KING_PST_MG[pst_idx]);
                    out.pst_eg += i32::from(KING_PST_EG[pst_idx]);
                }
            }
            idx = slot.next;
        }
    }

    /// Pawn structure, cached under the pawn hash.
    fn pawn_structure(
        &mut self,
        board: &Board,
        endgame: bool,
        w: &SideTally,
        b: &SideTally,
    ) -> (PawnEntry, RookFiles) {
        let hash = board.pawn_hash();
        if let Some(hit) = self.pawn_table.probe(hash, endgame) {
            return hit;
        }

        let mut value = 0i32;
        let mut w_files = 0u8;
        let mut b_files = 0u8;
        let mut w_passed = 0u8;
        let mut b_passed = 0u8;

        for &sq in &w.pawn_sqs[..w.pawn_count] {
            w_files |= 1 << (file_of(sq as Sq) - 1);
        }
        for &sq in &b.pawn_sqs[..b.pawn_count] {
            b_files |= 1 << (file_of(sq as Sq) - 1);
        }

        for &sq in &w.pawn_sqs[..w.pawn_count] {
            let sq = sq as Sq;
            let file_bit = 1u8 << (file_of(sq) - 1);
            let neighbors = neighbor_files(file_bit);
            if w_files & neighbors == 0 {
                value -= 14; // isolated
            }
            if doubled(&w.pawn_sqs[..w.pawn_count], sq) {
                value -= 10;
            }
            if is_passed(&b.pawn_sqs[..b.pawn_count], sq, Color::White) {
                w_passed |= file_bit;
                value += PASSED_BONUS[rank_of(sq) - 1];
            }
        }
        for &sq in &b.pawn_sqs[..b.pawn_count] {
            let sq = sq as Sq;
            let file_bit = 1u8 << (file_of(sq) - 1);
            let neighbors = neighbor_files(file_bit);
            if b_files & neighbors == 0 {
                value += 14;
            }
            if doubled(&b.pawn_sqs[..b.pawn_count], sq) {
                value += 10;
            }
            if is_passed(&w.pawn_sqs[..w.pawn_count], sq, Color::Black) {
                b_passed |= file_bit;
                value -= PASSED_BONUS[8 - rank_of(sq)];
            }
        }

        if endgame {
            // structure weaknesses weigh more once the pieces are gone
            value += value / 2;
        }

        let entry = PawnEntry {
            value,
            endgame,
            w_passed,
            b_passed,
        };
        let rooks = RookFiles {
            w_open: !w_files,
            b_open: !b_files,
        };
        self.pawn_table.store(hash, entry, rooks);
        (entry, rooks)
    }

    /// Lone pawn against lone king: defer to the KPK probe.
    fn probe_kpk(
        &mut self,
        board: &Board,
        side: Color,
        w: &SideTally,
        b: &SideTally,
        is_endgame: bool,
    ) -> Option<EvalResult> {
        let only_pawn_w = w.npm == 0 && b.npm == 0 && w.pawns == 1 && b.pawns == 0;
        let only_pawn_b = w.npm == 0 && b.npm == 0 && b.pawns == 1 && w.pawns == 0;
        if !only_pawn_w && !only_pawn_b {
            return None;
        }
        self.tb_hits += 1;

        let stm = board.side_to_move();
        let (winning, pawn_sq, for_white) = if only_pawn_w {
            (
                kpk::probe(
                    stm,
                    to_64(board.king_sq(Color::White)),
                    to_64(w.lone_pawn_sq),
                    to_64(board.king_sq(Color::Black)),
                ),
                w.lone_pawn_sq,
                true,
            )
        } else {
            (
                kpk::probe_reverse(
                    stm,
                    to_64(board.king_sq(Color::Black)),
                    to_64(b.lone_pawn_sq),
                    to_64(board.king_sq(Color::White)),
                ),
                b.lone_pawn_sq,
                false,
            )
        };

        let mut score = if !winning {
            0
        } else {
            let rank = if for_white {
                rank_of(pawn_sq)
            } else {
                9 - rank_of(pawn_sq)
            };
            let cp = KPK_WIN_BONUS + PAWN_V + 20 * rank as i32;
            if for_white {
                cp
            } else {
                -cp
            }
        };
        if side == Color::Black {
            score = -score;
        }
        Some(EvalResult {
            score,
            material_enough: 1,
            is_endgame,
            w_passed: if for_white && winning { file_mask_of(pawn_sq) } else { 0 },
            b_passed: if !for_white && winning { file_mask_of(pawn_sq) } else { 0 },
        })
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn file_mask_of(sq: Sq) -> u8 {
    1 << (file_of(sq) - 1)
}

fn neighbor_files(file_bit: u8) -> u8 {
    (file_bit << 1) | (file_bit >> 1)
}

fn doubled(pawns: &[u8], sq: Sq) -> bool {
    pawns
        .iter()
        .any(|&p| p as Sq != sq && file_of(p as Sq) == file_of(sq) && (p as Sq) < sq)
}

/// No enemy pawn on the same or adjacent file ahead of this pawn.
fn is_passed(enemy_pawns: &[u8], sq: Sq, color: Color) -> bool {
    let file = file_of(sq);
    let rank = rank_of(sq);
    !enemy_pawns.iter().any(|&p| {
        let p = p as Sq;
        file_of(p).abs_diff(file) <= 1
            && match color {
                Color::White => rank_of(p) > rank,
                Color::Black => rank_of(p) < rank,
            }
    })
}

fn rook_file_score(board: &Board, color: Color, files: RookFiles) -> i32 {
    let (own_open, enemy_open) = match color {
        Color::White => (files.w_open, files.b_open),
        Color::Black => (files.b_open, files.w_open),
    };
    let mut score = 0;
    let mut idx = Board::head(color);
    while idx != crate::board::NIL {
        let slot = &board.arena[idx as usize];
        if slot.kind.base() == 5 {
            let bit = 1u8 << (file_of(slot.sq as Sq) - 1);
            if own_open & bit != 0 {
                score += 12;
                if enemy_open & bit != 0 {
                    score += 6;
                }
            }
        }
        idx = slot.next;
    }
    score
}

fn passed_run_bonus(side: &SideTally, passed: u8, color: Color) -> i32 {
    let mut bonus = 0;
    for &sq in &side.pawn_sqs[..side.pawn_count] {
        let sq = sq as Sq;
        if passed & (1 << (file_of(sq) - 1)) != 0 {
            let steps = match color {
                Color::White => 8 - rank_of(sq),
                Color::Black => rank_of(sq) - 1,
            };
            bonus += 12 * (7 - steps as i32).max(0);
        }
    }
    bonus
}

/// 0 for dead-draw material, otherwise a piece-weight ordinal.
fn material_ordinal(w: &SideTally, b: &SideTally) -> i32 {
    let w_minors = w.knights + w.bishops;
    let b_minors = b.knights + b.bishops;
    let w_heavy = w.rooks + w.queens + w.pawns;
    let b_heavy = b.rooks + b.queens + b.pawns;

    if w_heavy == 0 && b_heavy == 0 {
        // bare kings, a single minor, or same-colored single bishops
        let total_minors = w_minors + b_minors;
        if total_minors == 0 {
            return 0;
        }
        if total_minors == 1 {
            return 0;
        }
        if w.bishops == 1 && b.bishops == 1 && w.knights == 0 && b.knights == 0 {
            if w.bishop_colors == b.bishop_colors {
                return 0;
            }
        }
    }

    w.pawns + b.pawns
        + 3 * (w_minors + b_minors)
        + 5 * (w.rooks + b.rooks)
        + 9 * (w.queens + b.queens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(fen: &str) -> (Evaluator, EvalResult) {
        let board = Board::from_fen(fen).unwrap();
        let mut ev = Evaluator::new();
        let side = board.side_to_move();
        let result = ev.evaluate(&board, side);
        (ev, result)
    }

    #[test]
    fn test_dead_draws_score_zero() {
        for fen in [
            "8/8/8/4k3/8/8/8/4K3 w - - 0 1",
            "8/8/8/4k3/8/5N2/8/4K3 w - - 0 1",
            "8/8/8/4k3/8/5B2/8/4K3 b - - 0 1",
            // both bishops on light squares
            "8/8/8/3bk3/8/8/3B4/4K3 w - - 0 1",
        ] {
            let (_, r) = eval(fen);
            assert_eq!(r.score, 0, "{fen}");
            assert_eq!(r.material_enough, 0, "{fen}");
        }
    }

    #[test]
    fn test_opposite_colored_bishops_not_dead() {
        let (_, r) = eval("8/8/8/3bk3/8/8/4B3/4K3 w - - 0 1");
        assert_ne!(r.material_enough, 0);
    }

    #[test]
    fn test_startpos_roughly_balanced() {
        let (_, r) = eval("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(r.score.abs() < 60);
        assert!(!r.is_endgame);
        assert!(r.material_enough >= NULL_PIECES);
    }

    #[test]
    fn test_score_is_side_relative() {
        let fen_w = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1";
        let fen_b = "4k3/8/8/8/8/8/4P3/4K3 b - - 0 1";
        let (_, rw) = eval(fen_w);
        let (_, rb) = eval(fen_b);
        // white owns the extra pawn: positive for white, negative for black
        assert!(rw.score >= 0);
        assert!(rb.score <= 0);
    }

    #[test]
    fn test_passed_pawn_masks() {
        let (_, r) = eval("4k3/8/8/3P4/8/8/6p1/4K3 w - - 0 1");
        assert!(r.is_endgame);
        assert_eq!(r.w_passed, 1 << 3); // d-file
        assert_eq!(r.b_passed, 1 << 6); // g-file
    }

    #[test]
    fn test_kpk_draw_scores_zero() {
        // defender holds the rook-pawn corner
        let (ev, r) = eval("2k5/8/P7/1K6/8/8/8/8 w - - 0 1");
        assert_eq!(r.score, 0);
        assert!(ev.tb_hits > 0);
    }

    #[test]
    fn test_kpk_win_scores_high() {
        // the defending king is far outside the square of the e5 pawn
        let (_, r) = eval("8/8/8/4P3/8/8/8/K6k w - - 0 1");
        assert!(r.score > 500);
    }

    #[test]
    fn test_pawn_cache_round_trip() {
        let board =
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let mut ev = Evaluator::new();
        let a = ev.evaluate(&board, Color::White).score;
        let b = ev.evaluate(&board, Color::White).score;
        assert_eq!(a, b);
    }
}
