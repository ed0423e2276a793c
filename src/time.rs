//! Move time allocation from the UCI clock parameters.
//!
//! The budget follows a simple expected-moves model: with `movestogo` the
//! remaining time is split evenly (keeping a 100 ms reserve), otherwise
//! the game is assumed to last 48 moves at the start, tapering to 20 from
//! move 70 on. Middlegame moves get a 25% top-up since early moves tend
//! to leave time savings. Increments are consumed progressively less the
//! shorter the remaining time.

use crate::search::INFINITE_TIME;

/// Clock fields from a `go` command, milliseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoClocks {
    pub wtime: Option<i64>,
    pub btime: Option<i64>,
    pub winc: i64,
    pub binc: i64,
    pub moves_to_go: i64,
}

/// How much of an increment to bank, depending on the main time left.
fn increment_share(remaining: i64, increment: i64) -> i64 {
    if remaining >= increment * 12 / 5 {
        increment * 7 / 5
    } else if remaining >= increment * 3 / 2 {
        increment
    } else if remaining >= increment {
        increment * 3 / 4
    } else {
        increment / 2
    }
}

fn allot_side(
    remaining: Option<i64>,
    increment: i64,
    moves_to_go: i64,
    move_number: i64,
) -> i64 {
    let Some(remaining) = remaining else {
        return INFINITE_TIME - 42;
    };

    let mut move_time = if moves_to_go > 0 {
        let mut t = (remaining - 100) / moves_to_go;
        if move_number >= 10 && moves_to_go >= 10 {
            t = t * 5 / 4;
        }
        t
    } else {
        let expected_moves = if move_number >= 70 {
            20
        } else {
            48 - (move_number * 2) / 5
        };
        let mut t = (remaining - 100) / expected_moves;
        if (10..=30).contains(&move_number) {
            t = t * 5 / 4;
        }
        t
    };

    if increment > 0 {
        move_time += increment_share(remaining, increment);
        move_time = move_time.min(remaining - 100);
    }
    move_time.max(0)
}

/// Compute both sides' budgets; `move_number` counts full moves from 1.
#[must_use]
pub fn allot_move_time(clocks: &GoClocks, move_number: i64) -> (i64, i64) {
    (
        allot_side(clocks.wtime, clocks.winc, clocks.moves_to_go, move_number),
        allot_side(clocks.btime, clocks.binc, clocks.moves_to_go, move_number),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movestogo_splits_evenly() {
        let clocks = GoClocks {
            wtime: Some(60_100),
            moves_to_go: 30,
            ..Default::default()
        };
        let (w, _) = allot_move_time(&clocks, 1);
        assert_eq!(w, 2000);
    }

    #[test]
    fn test_movestogo_topup_after_move_ten() {
        let clocks = GoClocks {
            wtime: Some(60_100),
            moves_to_go: 30,
            ..Default::default()
        };
        let (w, _) = allot_move_time(&clocks, 12);
        assert_eq!(w, 2500);
    }

    #[test]
    fn test_sudden_death_expected_moves() {
        let clocks = GoClocks {
            wtime: Some(48_100),
            ..Default::default()
        };
        // move 1: 48 expected moves
        let (w, _) = allot_move_time(&clocks, 1);
        assert_eq!(w, 1000);
        // move 70+: 20 expected moves
        let (w, _) = allot_move_time(&clocks, 75);
        assert_eq!(w, 2400);
    }

    #[test]
    fn test_increment_shares() {
        assert_eq!(increment_share(10_000, 1000), 1400);
        assert_eq!(increment_share(1_800, 1000), 1000);
        assert_eq!(increment_share(1_200, 1000), 750);
        assert_eq!(increment_share(800, 1000), 500);
    }

    #[test]
    fn test_budget_capped_at_remaining() {
        let clocks = GoClocks {
            wtime: Some(500),
            winc: 5000,
            ..Default::default()
        };
        let (w, _) = allot_move_time(&clocks, 1);
        assert!(w <= 400);
    }

    #[test]
    fn test_missing_clock_is_effectively_infinite() {
        let clocks = GoClocks::default();
        let (w, b) = allot_move_time(&clocks, 1);
        assert!(w > INFINITE_TIME / 2);
        assert!(b > INFINITE_TIME / 2);
    }
}
