//! Serialized engine output.
//!
//! `info`, `bestmove` and `readyok` can originate from either thread; a
//! single lock keeps lines from interleaving on the wire.

use std::io::Write;

use parking_lot::Mutex;

pub struct Printer {
    lock: Mutex<()>,
}

impl Printer {
    #[must_use]
    pub fn new() -> Printer {
        Printer { lock: Mutex::new(()) }
    }

    /// Write one line and flush; stdout must never buffer UCI output.
    pub fn line(&self, s: &str) {
        let _guard = self.lock.lock();
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{s}");
        let _ = handle.flush();
    }

    /// Write several lines under one lock so they stay together.
    pub fn lines(&self, lines: &[&str]) {
        let _guard = self.lock.lock();
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        for s in lines {
            let _ = writeln!(handle, "{s}");
        }
        let _ = handle.flush();
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}
