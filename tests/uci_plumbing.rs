//! Worker/input-thread coupling exercised without a real stdin: commands
//! are pushed straight into the ring buffer and the thread interplay is
//! observed through the events, exactly as the input thread would.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mailbox::uci::ring::CmdKind;
use mailbox::uci::worker::Worker;
use mailbox::uci::EngineIo;

struct Rig {
    io: Arc<EngineIo>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Rig {
    fn start() -> Rig {
        let io = Arc::new(EngineIo::new());
        let worker_io = Arc::clone(&io);
        let handle = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(move || {
                let mut worker = Worker::new(worker_io);
                worker.run();
            })
            .unwrap();
        Rig {
            io,
            handle: Some(handle),
        }
    }

    fn send(&self, cmd: &str) {
        let kind = if cmd.starts_with("position") {
            CmdKind::Position
        } else {
            CmdKind::Generic
        };
        self.io.ring.write_cmd(cmd, kind);
        self.io.uci_event.set();
    }

    /// The input thread's stop sequence.
    fn stop(&self) {
        self.io.abort_conf_event.wait_reset(0);
        self.io.abort.set();
        self.io.abort_event.set();
        self.io.ring.write_cmd("stop", CmdKind::Stop);
        self.io.uci_event.set();
        assert!(
            self.io.abort_conf_event.wait_reset(5000),
            "worker did not confirm the stop"
        );
        assert!(!self.io.abort.is_set(), "abort flag not consumed");
    }

    fn quit(mut self) {
        self.io.abort.set();
        self.io.abort_event.set();
        self.send("quit");
        let handle = self.handle.take().unwrap();
        assert!(handle.join().is_ok());
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.io.abort.set();
            self.io.abort_event.set();
            self.send("quit");
            let _ = handle.join();
        }
    }
}

#[test]
fn test_depth_limited_go_completes_and_quits() {
    let rig = Rig::start();
    rig.send("position startpos moves e2e4 e7e5");
    rig.send("go depth 3");
    rig.quit(); // quit queues behind go: join proves the search returned
}

#[test]
fn test_stop_terminates_infinite_search() {
    let rig = Rig::start();
    // a position the book cannot answer, so "go infinite" really searches
    rig.send("position fen r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3");
    rig.send("go infinite");
    std::thread::sleep(Duration::from_millis(300));

    let start = Instant::now();
    rig.stop();
    assert!(start.elapsed() < Duration::from_secs(5));

    // the engine must accept another go right away
    rig.send("go movetime 100");
    rig.quit();
}

#[test]
fn test_rapid_go_stop_pairs() {
    let rig = Rig::start();
    rig.send("position startpos");
    for _ in 0..3 {
        rig.send("go infinite");
        std::thread::sleep(Duration::from_millis(50));
        rig.stop();
    }
    rig.quit();
}

#[test]
fn test_hash_resize_signals_work_event() {
    let rig = Rig::start();
    rig.io.cmd_work_event.wait_reset(0);
    rig.send("setoption name hash value 32");
    assert!(
        rig.io.cmd_work_event.wait_reset(5000),
        "hash resize did not signal completion"
    );
    rig.quit();
}

#[test]
fn test_ucinewgame_signals_work_event() {
    let rig = Rig::start();
    rig.io.cmd_work_event.wait_reset(0);
    rig.send("ucinewgame");
    assert!(rig.io.cmd_work_event.wait_reset(5000));
    rig.quit();
}

#[test]
fn test_illegal_position_answered_without_crash() {
    let rig = Rig::start();
    rig.send("position fen not/a/position w - - 0 1");
    rig.send("go depth 2"); // must answer bestmove 0000, not crash
    rig.send("position startpos");
    rig.send("go depth 2");
    rig.quit();
}

#[test]
fn test_ponder_prefix_then_ponderhit() {
    let rig = Rig::start();
    rig.send("position startpos");
    rig.send("go ponder e2e4 movetime 50");
    std::thread::sleep(Duration::from_millis(100));
    // ponderhit converts the prefix into a real (short) search
    rig.send("ponderhit");
    rig.quit();
}
