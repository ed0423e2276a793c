//! Time keeping, node-budget polling, and CPU/NPS throttling.
//!
//! The search avoids system clock calls by polling only every ~1 ms worth
//! of nodes; the node rate is calibrated over the first 10 ms and then
//! refreshed once per second. Throttling carves each second into frames:
//! percentage mode runs the first `cpu_speed` frames of 10 ms and sleeps
//! the rest on the abort event (so a stop still lands immediately), NPS
//! mode runs until the per-second node allowance is consumed and sleeps to
//! the next second boundary.

use std::time::Instant;

use super::{CurrMoveMode, SearchContext};

/// Ten years, the "no time limit" sentinel.
pub const INFINITE_TIME: i64 = 1000 * 60 * 60 * 24 * 365 * 10;

pub const MAX_THROTTLE_NPS: u64 = 30_000_000;

/// Why the search stopped before finishing on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Timeout,
    Nodes,
    Abort,
}

pub(crate) struct Timer {
    start: Instant,
    pub stop_time: i64,
    pub start_time_nps: i64,
    pub output_time: i64,
    pub throttle_time: i64,
    pub sleep_time: i64,
    pub nps_1ms: u64,
    pub last_nodes: u64,
    pub last_throttle_nodes: u64,
    pub nodes_current_second: u64,
    pub nps_startup_phase: bool,
    pub effective_cpu_speed: i32,
    pub effective_max_nps_rate: u64,
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            start: Instant::now(),
            stop_time: INFINITE_TIME,
            start_time_nps: 0,
            output_time: 1000,
            throttle_time: INFINITE_TIME,
            sleep_time: 0,
            nps_1ms: 500,
            last_nodes: 0,
            last_throttle_nodes: 0,
            nodes_current_second: 1,
            nps_startup_phase: true,
            effective_cpu_speed: 100,
            effective_max_nps_rate: MAX_THROTTLE_NPS,
        }
    }

    /// Milliseconds since this search started.
    #[inline]
    pub fn now_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }

    /// Shrink the effective throttle when the move time ends within the
    /// next second.
    pub fn calc_throttle(&mut self, current_time: i64) {
        let remaining = self.stop_time - current_time;
        if remaining < 1000 {
            if remaining > 0 {
                if self.effective_cpu_speed < 100 {
                    self.effective_cpu_speed =
                        ((i64::from(self.effective_cpu_speed) * remaining + 500) / 1000) as i32;
                }
                self.effective_max_nps_rate =
                    (self.effective_max_nps_rate * remaining as u64 + 500) / 1000;
            } else {
                self.effective_cpu_speed = 0;
                self.effective_max_nps_rate = 0;
            }
        }
    }
}

impl SearchContext<'_> {
    /// Periodic `info` line, once per second; also re-calibrates the node
    /// rate and resets the per-second node budget.
    pub(crate) fn periodic_output(&mut self, current_time: i64, subtract_time: i64) {
        if current_time < self.timer.output_time {
            return;
        }
        let time_passed = current_time;
        let nps = if time_passed > 0 {
            self.g_nodes * 1000 / time_passed as u64
        } else {
            0
        };

        let calib = current_time - self.timer.start_time_nps - subtract_time;
        if calib > 0 {
            self.timer.nps_1ms = self.g_nodes / calib as u64;
        }

        let mut line = format!(
            "info time {} nodes {} nps {} hashfull {} tbhits {}",
            time_passed,
            self.g_nodes,
            nps,
            self.tts.usage_permill(),
            self.eval.tb_hits,
        );
        if self.settings.show_currmove == CurrMoveMode::EverySecond && !self.curr_move.is_none() {
            line.push_str(&format!(
                " currmove {} currmovenumber {}",
                self.curr_move.to_uci(),
                self.curr_move_number + 1
            ));
        }
        self.printer.line(&line);

        self.timer.nodes_current_second = 0;
        self.timer.calc_throttle(self.timer.output_time);
        self.timer.output_time += 1000;
    }

    /// The ~1 ms poll: time, node budget, abort flag, then throttling.
    /// Returns the reason to stop, if any.
    pub(crate) fn check_time_throttle(&mut self) -> Option<StopReason> {
        self.timer.nodes_current_second += self.g_nodes - self.timer.last_throttle_nodes;
        self.timer.last_throttle_nodes = self.g_nodes;
        if self.g_nodes - self.timer.last_nodes < self.timer.nps_1ms
            && self.timer.nodes_current_second < self.timer.effective_max_nps_rate
        {
            return None;
        }

        let mut current_time = self.timer.now_ms();

        if current_time >= self.timer.stop_time {
            return Some(StopReason::Timeout);
        }
        if self.g_max_nodes != 0 && self.g_nodes + self.timer.nps_1ms * 5 / 4 >= self.g_max_nodes {
            return Some(StopReason::Nodes);
        }
        if self.abort.is_set() {
            return Some(StopReason::Abort);
        }

        if self.timer.nps_startup_phase {
            let calib = current_time - self.timer.start_time_nps - self.timer.sleep_time;
            if calib > 0 {
                self.timer.nps_1ms = (self.g_nodes / calib as u64).max(500);
                if calib >= 10 {
                    self.timer.nps_startup_phase = false;
                }
            }
        }

        self.timer.last_nodes = self.g_nodes;

        let nps_throttle = self.timer.nodes_current_second >= self.timer.effective_max_nps_rate;
        let cpu_throttle = current_time >= self.timer.throttle_time;

        if nps_throttle || cpu_throttle {
            let start_throttle_time = current_time;
            let stop_throttle_time = self.timer.output_time;
            // percentage mode busy-waits the last 50 ms of a pause so the
            // CPU frequency has ramped back up when the run frame starts
            let stop_sleep_time = if cpu_throttle && !nps_throttle {
                stop_throttle_time - 50
            } else {
                stop_throttle_time
            }
            .min(self.timer.stop_time);

            while current_time < stop_throttle_time {
                if current_time < stop_sleep_time {
                    self.abort_event
                        .wait_reset(stop_sleep_time - current_time + 1);
                }
                current_time = self.timer.now_ms();
                if current_time >= self.timer.stop_time {
                    return Some(StopReason::Timeout);
                }
                if self.abort.is_set() {
                    return Some(StopReason::Abort);
                }
                self.periodic_output(
                    current_time,
                    self.timer.sleep_time + current_time - start_throttle_time,
                );
            }

            // restart the percentage frame window for the next second
            if current_time >= self.timer.throttle_time - 2000 {
                let mut next = current_time + i64::from(self.timer.effective_cpu_speed) * 10;
                let max_throttle = if current_time >= self.timer.output_time {
                    self.timer.output_time + 1000
                } else {
                    self.timer.output_time
                };
                if next > max_throttle {
                    next = max_throttle;
                }
                self.timer.throttle_time = next;
            }
            self.timer.sleep_time += current_time - start_throttle_time;
        }

        self.periodic_output(current_time, self.timer.sleep_time);
        None
    }

    /// Park until the move time is over or an abort arrives, emitting the
    /// periodic info line. Used by `go infinite` once the result is known.
    pub(crate) fn wait_for_abort(&mut self) {
        loop {
            let current_time = self.timer.now_ms();
            if current_time >= self.timer.stop_time || self.abort.is_set() {
                return;
            }
            if current_time >= self.timer.output_time {
                let line = format!(
                    "info time {} nodes {} nps 0 hashfull {} tbhits {}",
                    current_time,
                    self.g_nodes,
                    self.tts.usage_permill(),
                    self.eval.tb_hits,
                );
                self.printer.line(&line);
                self.timer.output_time += 1000;
            }
            let wakeup = self.timer.output_time.min(self.timer.stop_time);
            if current_time < wakeup {
                self.abort_event.wait_reset(wakeup - current_time);
            }
        }
    }

    /// Poll wrapper used at node boundaries: records the stop reason once.
    #[inline]
    pub(crate) fn poll_time(&mut self) {
        if self.time_is_up.is_none() {
            self.time_is_up = self.check_time_throttle();
        }
    }
}
