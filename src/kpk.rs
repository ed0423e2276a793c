//! King-and-pawn versus king probe.
//!
//! A compact rule-based classifier instead of a packed bitbase: rule of
//! the square, key squares, and the rook-pawn corner exceptions. `true`
//! means the pawn side wins with correct play; `false` is a draw as far
//! as the rules can tell. The evaluator treats `false` as a dead draw,
//! so the rules err on the drawish side.

use crate::board::Color;

#[inline]
fn file(sq: usize) -> usize {
    sq % 8
}

#[inline]
fn rank(sq: usize) -> usize {
    sq / 8
}

#[inline]
fn cheb(a: usize, b: usize) -> usize {
    file(a).abs_diff(file(b)).max(rank(a).abs_diff(rank(b)))
}

/// Probe with a white pawn: squares in 0..63 file-major order.
#[must_use]
pub fn probe(side_to_move: Color, w_king: usize, w_pawn: usize, b_king: usize) -> bool {
    let pfile = file(w_pawn);
    let prom = 56 + pfile;

    // defender simply takes the undefended pawn
    if side_to_move == Color::Black && cheb(b_king, w_pawn) <= 1 && cheb(w_king, w_pawn) > 1 {
        return false;
    }

    // a pawn still at home may double-step
    let eff_rank = rank(w_pawn).max(2);
    let pawn_steps = 7 - eff_rank;

    if pfile == 0 || pfile == 7 {
        // rook pawn: the defender holds the corner from two squares out
        if cheb(b_king, prom) <= 2 && cheb(b_king, w_pawn) <= cheb(w_king, w_pawn) + 1 {
            return false;
        }
        // attacker shelters the promotion square and the defender is away
        if cheb(w_king, prom) <= 1 && cheb(b_king, prom) >= 3 {
            return true;
        }
        return outside_square(side_to_move, w_pawn, pawn_steps, b_king, prom);
    }

    if outside_square(side_to_move, w_pawn, pawn_steps, b_king, prom) {
        return true;
    }

    // a defender that reaches the pawn before the attacker can defend it
    // picks it up no matter how advanced the attacking king is
    let defender_race = cheb(b_king, w_pawn) + usize::from(side_to_move == Color::White);
    if defender_race < cheb(w_king, w_pawn) {
        return false;
    }

    // key squares: with the attacking king two ranks ahead of the pawn
    // (one rank from the fifth on), the win is mechanical
    let kr = rank(w_king);
    let kf = file(w_king);
    let ahead = if rank(w_pawn) >= 4 { 1 } else { 2 };
    if kf.abs_diff(pfile) <= 1 && kr >= rank(w_pawn) + ahead && kr <= 7 {
        return true;
    }

    false
}

/// Is the defending king outside the square of the pawn?
fn outside_square(
    side_to_move: Color,
    w_pawn: usize,
    pawn_steps: usize,
    b_king: usize,
    prom: usize,
) -> bool {
    let mut defender_steps = cheb(b_king, prom);
    if side_to_move == Color::Black {
        defender_steps = defender_steps.saturating_sub(1);
    }
    let _ = w_pawn;
    defender_steps > pawn_steps
}

/// Probe with a black pawn by mirroring the board vertically.
#[must_use]
pub fn probe_reverse(side_to_move: Color, b_king: usize, b_pawn: usize, w_king: usize) -> bool {
    probe(side_to_move.opp(), b_king ^ 56, b_pawn ^ 56, w_king ^ 56)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> usize {
        let b = s.as_bytes();
        (b[1] - b'1') as usize * 8 + (b[0] - b'a') as usize
    }

    #[test]
    fn test_unstoppable_pawn_wins() {
        // pawn e6, defender on h8 is outside the square
        assert!(probe(Color::White, sq("a1"), sq("e6"), sq("h8")));
        // with black to move the king steps into the square
        assert!(!probe(Color::Black, sq("a1"), sq("e5"), sq("h8")));
    }

    #[test]
    fn test_king_on_key_square_wins() {
        assert!(probe(Color::White, sq("e4"), sq("e2"), sq("e8")));
        assert!(probe(Color::Black, sq("d6"), sq("d4"), sq("d8")));
    }

    #[test]
    fn test_defender_in_front_draws() {
        // attacker behind its pawn, defender blocks
        assert!(!probe(Color::White, sq("e3"), sq("e4"), sq("e7")));
    }

    #[test]
    fn test_rook_pawn_corner_draw() {
        // defender reaches the corner: dead draw
        assert!(!probe(Color::White, sq("b6"), sq("a6"), sq("c8")));
        assert!(!probe(Color::Black, sq("a6"), sq("a5"), sq("b8")));
    }

    #[test]
    fn test_rook_pawn_sheltered_promotion_wins() {
        assert!(probe(Color::White, sq("b7"), sq("a5"), sq("e5")));
    }

    #[test]
    fn test_defender_takes_hanging_pawn() {
        assert!(!probe(Color::Black, sq("a1"), sq("d4"), sq("e5")));
    }

    #[test]
    fn test_reverse_probe_mirrors() {
        // black pawn d4, black king d6: mirrored key-square win
        assert!(probe_reverse(Color::White, sq("d3"), sq("d5"), sq("d1")));
    }
}
