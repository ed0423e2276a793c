//! UCI option surface and `setoption` handling.

use crate::search::{CurrMoveMode, SearchSettings, CONTEMPT_END_DEFAULT, CONTEMPT_VAL_DEFAULT};
use crate::tt::{HASH_DEFAULT_MB, HASH_MAX_MB, HASH_MIN_MB};
use crate::uci::print::Printer;

pub const MOVE_OVERHEAD_DEFAULT: i64 = 100;
pub const MAX_THROTTLE_KNPS: i64 = 30_000;

/// What the worker has to do after an option changed.
pub enum OptionAction {
    None,
    /// Reallocate the hash tables with the new size in MiB.
    ResizeHash(usize),
    /// Zero the hash tables.
    ClearHash,
    /// Print the current book moves.
    ShowBookMoves,
}

pub struct EngineOptions {
    pub hash_mb: usize,
    pub keep_hash: bool,
    pub own_book: bool,
    pub contempt_val: i32,
    pub contempt_end: i32,
    pub show_currmove: CurrMoveMode,
    pub limit_strength: bool,
    pub elo: i32,
    pub cpu_speed: i32,
    pub max_knps: i64,
    pub move_overhead: i64,
    pub eval_noise: i32,
}

impl EngineOptions {
    #[must_use]
    pub fn new() -> EngineOptions {
        EngineOptions {
            hash_mb: HASH_DEFAULT_MB,
            keep_hash: true,
            own_book: true,
            contempt_val: CONTEMPT_VAL_DEFAULT,
            contempt_end: CONTEMPT_END_DEFAULT,
            show_currmove: CurrMoveMode::EverySecond,
            limit_strength: false,
            elo: 2200,
            cpu_speed: 100,
            max_knps: MAX_THROTTLE_KNPS,
            move_overhead: MOVE_OVERHEAD_DEFAULT,
            eval_noise: 0,
        }
    }

    /// The settings slice the search itself consumes.
    #[must_use]
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            contempt_val: self.contempt_val,
            contempt_end: self.contempt_end,
            eval_noise: self.effective_noise(),
            show_currmove: self.show_currmove,
        }
    }

    /// Effective NPS cap: the Elo limiter maps onto the NPS throttle with
    /// a plain linear curve.
    #[must_use]
    pub fn effective_nps(&self) -> u64 {
        if self.limit_strength {
            let span = (self.elo - 1000).clamp(0, 1800) as u64;
            (span * span / 120).max(1) * 1000 / 27
        } else {
            (self.max_knps * 1000) as u64
        }
    }

    #[must_use]
    pub fn effective_noise(&self) -> i32 {
        if self.limit_strength && self.elo < 1600 {
            // very low settings also blunt the tactics
            ((1600 - self.elo) / 20).clamp(0, 100)
        } else {
            self.eval_noise
        }
    }

    /// Apply one `setoption` (names arrive lowercased). Returns the
    /// follow-up work for the worker.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> OptionAction {
        let int = |v: Option<&str>| v.and_then(|s| s.parse::<i64>().ok());
        let boolean =
            |v: Option<&str>| v.map(|s| s.trim() == "true").unwrap_or(false);
        match name {
            "hash" => {
                let mb = int(value).unwrap_or(HASH_DEFAULT_MB as i64).clamp(
                    HASH_MIN_MB as i64,
                    HASH_MAX_MB as i64,
                ) as usize;
                if mb != self.hash_mb {
                    self.hash_mb = mb;
                    return OptionAction::ResizeHash(mb);
                }
            }
            "clear hash" => return OptionAction::ClearHash,
            "keep hash tables" => self.keep_hash = boolean(value),
            "ownbook" => self.own_book = boolean(value),
            "book moves" => return OptionAction::ShowBookMoves,
            "contempt value [cps]" => {
                // the UCI value is from the GUI's view; internally the
                // sign is flipped so a draw against a stronger opponent
                // counts slightly positive
                let v = int(value).unwrap_or(-i64::from(CONTEMPT_VAL_DEFAULT));
                self.contempt_val = -(v.clamp(-300, 300) as i32);
            }
            "contempt end [moves]" => {
                let v = int(value).unwrap_or(i64::from(CONTEMPT_END_DEFAULT / 2));
                self.contempt_end =
                    (v.clamp(0, crate::board::MAX_PLIES as i64 / 2) * 2) as i32;
            }
            "show current move" => {
                self.show_currmove = match value.map(str::trim) {
                    Some("continuously") => CurrMoveMode::Continuously,
                    _ => CurrMoveMode::EverySecond,
                };
            }
            "uci_limitstrength" => self.limit_strength = boolean(value),
            "uci_elo" => {
                self.elo = int(value).unwrap_or(2200).clamp(1000, 2800) as i32;
            }
            "cpu speed [%]" => {
                self.cpu_speed = int(value).unwrap_or(100).clamp(1, 100) as i32;
            }
            "cpu speed [knps]" => {
                self.max_knps = int(value).unwrap_or(MAX_THROTTLE_KNPS).clamp(1, MAX_THROTTLE_KNPS);
            }
            "move overhead [ms]" => {
                self.move_overhead = int(value).unwrap_or(MOVE_OVERHEAD_DEFAULT).clamp(0, 1000);
            }
            "eval noise [%]" => {
                self.eval_noise = int(value).unwrap_or(0).clamp(0, 100) as i32;
            }
            _ => log::debug!("ignoring unknown option '{name}'"),
        }
        OptionAction::None
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The `uci` banner with the option table; printed from the input thread
/// so the uciok ordering stays correct even during a search.
pub fn print_uci_info(printer: &Printer) {
    let half_plies = crate::board::MAX_PLIES / 2;
    let lines_owned = vec![
        "id name Mailbox 0.1".to_string(),
        "id author Mailbox authors".to_string(),
        format!(
            "option name Hash type spin default {HASH_DEFAULT_MB} min {HASH_MIN_MB} max {HASH_MAX_MB}"
        ),
        "option name Clear Hash type button".to_string(),
        "option name Keep Hash Tables type check default true".to_string(),
        "option name OwnBook type check default true".to_string(),
        "option name Book Moves type button".to_string(),
        format!(
            "option name Contempt Value [cps] type spin default {} min -300 max 300",
            -CONTEMPT_VAL_DEFAULT
        ),
        format!(
            "option name Contempt End [moves] type spin default {} min 0 max {half_plies}",
            CONTEMPT_END_DEFAULT / 2
        ),
        "option name Show Current Move type combo default Every Second var Continuously var Every Second"
            .to_string(),
        "option name UCI_LimitStrength type check default false".to_string(),
        "option name UCI_Elo type spin default 2200 min 1000 max 2800".to_string(),
        "option name CPU Speed [%] type spin default 100 min 1 max 100".to_string(),
        format!(
            "option name CPU Speed [kNPS] type spin default {MAX_THROTTLE_KNPS} min 1 max {MAX_THROTTLE_KNPS}"
        ),
        format!(
            "option name Move Overhead [ms] type spin default {MOVE_OVERHEAD_DEFAULT} min 0 max 1000"
        ),
        "option name Eval Noise [%] type spin default 0 min 0 max 100".to_string(),
        "uciok".to_string(),
    ];
    let refs: Vec<&str> = lines_owned.iter().map(String::as_str).collect();
    printer.lines(&refs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contempt_sign_inverted() {
        let mut opts = EngineOptions::new();
        opts.apply("contempt value [cps]", Some("50"));
        assert_eq!(opts.contempt_val, -50);
        opts.apply("contempt value [cps]", Some("-100"));
        assert_eq!(opts.contempt_val, 100);
    }

    #[test]
    fn test_hash_resize_clamped() {
        let mut opts = EngineOptions::new();
        match opts.apply("hash", Some("99999")) {
            OptionAction::ResizeHash(mb) => assert_eq!(mb, HASH_MAX_MB),
            _ => panic!("expected resize"),
        }
        // same value again: no action
        assert!(matches!(opts.apply("hash", Some("99999")), OptionAction::None));
    }

    #[test]
    fn test_currmove_combo() {
        let mut opts = EngineOptions::new();
        opts.apply("show current move", Some("continuously"));
        assert_eq!(opts.show_currmove, CurrMoveMode::Continuously);
        opts.apply("show current move", Some("every second"));
        assert_eq!(opts.show_currmove, CurrMoveMode::EverySecond);
    }

    #[test]
    fn test_elo_throttle_monotone() {
        let mut opts = EngineOptions::new();
        opts.limit_strength = true;
        opts.elo = 1200;
        let low = opts.effective_nps();
        opts.elo = 2400;
        let high = opts.effective_nps();
        assert!(low < high);
        assert!(low >= 1000);
    }

    #[test]
    fn test_unknown_option_ignored() {
        let mut opts = EngineOptions::new();
        assert!(matches!(opts.apply("bogus", Some("1")), OptionAction::None));
    }
}
