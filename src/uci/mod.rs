//! The UCI front: an input thread reading stdin and a worker thread
//! consuming framed commands from a ring buffer.
//!
//! `stop` is special-cased in the input thread: it sets the abort flag
//! and the abort event *before* the frame is enqueued, then waits for the
//! worker to confirm that the flag was consumed. That handshake is what
//! makes rapid `go`/`stop` pairs safe: a second `go` can only be read
//! after the first search has actually terminated.

pub mod command;
pub mod options;
pub mod print;
pub mod ring;
pub mod worker;

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sync::{Event, StopFlag};
use print::Printer;
use ring::{CmdKind, CommandRing};

/// Everything both threads share.
pub struct EngineIo {
    pub ring: CommandRing,
    pub printer: Printer,
    pub abort: StopFlag,
    /// Wakes the worker when the ring becomes non-empty.
    pub uci_event: Event,
    /// Signalled by the worker after `ucinewgame` or a hash resize.
    pub cmd_work_event: Event,
    /// Wakes throttle sleeps inside the search.
    pub abort_event: Event,
    /// Worker acknowledged a stop.
    pub abort_conf_event: Event,
    /// `debug on` echoing.
    pub debug: AtomicBool,
}

impl EngineIo {
    #[must_use]
    pub fn new() -> EngineIo {
        EngineIo {
            ring: CommandRing::new(),
            printer: Printer::new(),
            abort: StopFlag::new(),
            uci_event: Event::new(),
            cmd_work_event: Event::new(),
            abort_event: Event::new(),
            abort_conf_event: Event::new(),
            debug: AtomicBool::new(false),
        }
    }
}

impl Default for EngineIo {
    fn default() -> Self {
        Self::new()
    }
}

fn starts_with_cmd(line: &str, cmd: &str) -> bool {
    line.len() >= cmd.len()
        && line[..cmd.len()].eq_ignore_ascii_case(cmd)
        && line[cmd.len()..].chars().next().map_or(true, |c| c == ' ')
}

/// The input thread body: reads stdin until EOF or `quit`.
fn input_loop(io: &Arc<EngineIo>) {
    options::print_uci_info(&io.printer);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break; // stdin gone: shut down
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if starts_with_cmd(&line, "stop") {
            // drain a stale confirmation, then make sure the abort is
            // visible before the worker can see the frame
            io.abort_conf_event.wait_reset(0);
            io.abort.set();
            io.abort_event.set();
            io.ring.write_cmd("stop", CmdKind::Stop);
            io.uci_event.set();

            if !io.abort_conf_event.wait_reset(5000) || io.abort.is_set() {
                io.printer.line("info string error (thread sync failed)");
            }
            continue;
        }
        if starts_with_cmd(&line, "quit") {
            break;
        }
        if starts_with_cmd(&line, "isready") {
            // answered here so a `readyok` never waits behind a search
            io.printer.line("readyok");
            continue;
        }
        if starts_with_cmd(&line, "uci") && line.eq_ignore_ascii_case("uci") {
            options::print_uci_info(&io.printer);
            continue;
        }
        if starts_with_cmd(&line, "debug") {
            let on = line[5..].trim().eq_ignore_ascii_case("on");
            io.debug.store(on, Ordering::Relaxed);
            continue;
        }

        let kind = if starts_with_cmd(&line, "position") {
            CmdKind::Position
        } else {
            CmdKind::Generic
        };

        // commands that do real work defer the next isready via the
        // work event: reset it here, wait after enqueueing
        let wait_for_work = starts_with_cmd(&line, "ucinewgame")
            || line
                .to_ascii_lowercase()
                .starts_with("setoption name hash value ");
        if wait_for_work {
            io.cmd_work_event.wait_reset(0);
        }

        io.ring.write_cmd(&line, kind);
        io.uci_event.set();

        if wait_for_work {
            io.cmd_work_event.wait_reset(5000);
        }
    }

    // termination: abort any running search and stop the worker
    io.abort.set();
    io.abort_event.set();
    io.ring.write_cmd("quit", CmdKind::Stop);
    io.uci_event.set();
}

/// Run the engine: spawns the worker, reads stdin on the calling thread.
pub fn run() {
    let io = Arc::new(EngineIo::new());

    let worker_io = Arc::clone(&io);
    let worker_thread = std::thread::Builder::new()
        .name("worker".to_string())
        .stack_size(8 * 1024 * 1024)
        .spawn(move || {
            let mut worker = worker::Worker::new(worker_io);
            worker.run();
        })
        .expect("worker thread spawn failed");

    input_loop(&io);
    let _ = worker_thread.join();
}
