//! The command ring buffer between the input thread and the worker.
//!
//! Frames are a 2-byte big-endian length followed by the payload, not
//! null terminated. Commands are lowercased on the way in, except for the
//! FEN portion of a `position fen ...` command between the `fen` token
//! and the `moves` token, which stays case sensitive. When the buffer is
//! full the producer backs off for up to a second and then force-clears:
//! degrading commands beats blocking the input thread.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub const CMD_BUF_SIZE: usize = 13 * 1024;

/// How a command is framed and case-folded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmdKind {
    Generic,
    /// Preserve FEN case.
    Position,
    /// Sets the abort event before enqueueing.
    Stop,
}

struct RingInner {
    buf: Box<[u8; CMD_BUF_SIZE]>,
    read: usize,
    write: usize,
}

impl RingInner {
    fn free_for(&self, line_len: usize) -> bool {
        if self.read == self.write {
            return true; // empty
        }
        if self.read > self.write {
            self.read > self.write + line_len
        } else {
            self.read + CMD_BUF_SIZE > self.write + line_len
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.buf[self.write] = byte;
        self.write = if self.write < CMD_BUF_SIZE - 1 {
            self.write + 1
        } else {
            0
        };
    }
}

pub struct CommandRing {
    inner: Mutex<RingInner>,
}

impl CommandRing {
    #[must_use]
    pub fn new() -> CommandRing {
        CommandRing {
            inner: Mutex::new(RingInner {
                buf: Box::new([0; CMD_BUF_SIZE]),
                read: 0,
                write: 0,
            }),
        }
    }

    /// Enqueue one command frame. Returns false when the ring had to be
    /// force-cleared to make room.
    pub fn write_cmd(&self, line: &str, kind: CmdKind) -> bool {
        let payload = line.as_bytes();
        let cmd_len = payload.len().min(u16::MAX as usize);
        // +2 for the length prefix, +1 to avoid the empty ambiguity
        let line_len = cmd_len + 3;

        let mut inner = self.inner.lock();
        let mut forced = false;
        let back_off_until = Instant::now() + Duration::from_secs(1);
        while !inner.free_for(line_len) {
            if Instant::now() < back_off_until {
                drop(inner);
                std::thread::sleep(Duration::from_millis(10));
                inner = self.inner.lock();
            } else {
                // overwrite would garble the stream; drop everything
                inner.read = 0;
                inner.write = 0;
                forced = true;
            }
        }

        inner.push_byte((cmd_len >> 8) as u8);
        inner.push_byte(cmd_len as u8);

        if kind == CmdKind::Position {
            // scan for "fen"; lowercase until just past it, keep the FEN
            // body verbatim, resume lowercasing from "moves" on
            #[derive(PartialEq)]
            enum FenScan {
                F,
                E,
                N,
                Moves,
                Done,
            }
            let mut state = FenScan::F;
            for &b in &payload[..cmd_len] {
                let mut ch = b;
                match state {
                    FenScan::F => {
                        if ch == b'f' || ch == b'F' {
                            state = FenScan::E;
                        }
                    }
                    FenScan::E => {
                        state = if ch == b'e' || ch == b'E' {
                            FenScan::N
                        } else {
                            FenScan::F
                        };
                    }
                    FenScan::N => {
                        if ch == b'n' || ch == b'N' {
                            ch = b'n';
                            state = FenScan::Moves;
                        } else {
                            state = FenScan::F;
                        }
                    }
                    FenScan::Moves => {
                        if ch == b'm' || ch == b'M' {
                            state = FenScan::Done;
                        }
                    }
                    FenScan::Done => {}
                }
                let in_fen_body = state == FenScan::Moves;
                if !in_fen_body {
                    ch = ch.to_ascii_lowercase();
                }
                inner.push_byte(ch);
            }
        } else {
            for &b in &payload[..cmd_len] {
                inner.push_byte(b.to_ascii_lowercase());
            }
        }
        !forced
    }

    /// Dequeue the next frame, if any.
    #[must_use]
    pub fn read_cmd(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        if inner.read == inner.write {
            return None;
        }
        fn advance(inner: &mut RingInner) -> u8 {
            let b = inner.buf[inner.read];
            inner.read = if inner.read < CMD_BUF_SIZE - 1 {
                inner.read + 1
            } else {
                0
            };
            b
        }
        let hi = advance(&mut inner);
        let lo = advance(&mut inner);
        let cmd_len = (usize::from(hi) << 8) | usize::from(lo);

        let mut payload = Vec::with_capacity(cmd_len);
        if inner.read + cmd_len <= CMD_BUF_SIZE {
            payload.extend_from_slice(&inner.buf[inner.read..inner.read + cmd_len]);
            inner.read += cmd_len;
            if inner.read == CMD_BUF_SIZE {
                inner.read = 0;
            }
        } else {
            let first = CMD_BUF_SIZE - inner.read;
            payload.extend_from_slice(&inner.buf[inner.read..]);
            payload.extend_from_slice(&inner.buf[..cmd_len - first]);
            inner.read = cmd_len - first;
        }
        Some(String::from_utf8_lossy(&payload).into_owned())
    }
}

impl Default for CommandRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_lowercases() {
        let ring = CommandRing::new();
        assert!(ring.write_cmd("Go Depth 3", CmdKind::Generic));
        assert_eq!(ring.read_cmd().as_deref(), Some("go depth 3"));
        assert!(ring.read_cmd().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let ring = CommandRing::new();
        ring.write_cmd("first", CmdKind::Generic);
        ring.write_cmd("second", CmdKind::Generic);
        assert_eq!(ring.read_cmd().as_deref(), Some("first"));
        assert_eq!(ring.read_cmd().as_deref(), Some("second"));
    }

    #[test]
    fn test_position_preserves_fen_case() {
        let ring = CommandRing::new();
        let cmd = "POSITION FEN rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 MOVES E2E4";
        ring.write_cmd(cmd, CmdKind::Position);
        let got = ring.read_cmd().unwrap();
        assert!(got.starts_with("position fen rnbqkbnr/"));
        assert!(got.contains("PPPPPPPP/RNBQKBNR w KQkq - 0 1"));
        // everything from "moves" on is lowercased again
        assert!(got.ends_with("moves e2e4"));
    }

    #[test]
    fn test_wraparound() {
        let ring = CommandRing::new();
        // cycle enough data to wrap the 13 KiB buffer several times
        let payload = "x".repeat(1000);
        for _ in 0..50 {
            ring.write_cmd(&payload, CmdKind::Generic);
            assert_eq!(ring.read_cmd().unwrap().len(), 1000);
        }
    }

    #[test]
    fn test_force_clear_on_overflow() {
        let ring = CommandRing::new();
        let big = "y".repeat(4000);
        // fill without draining; the fourth write cannot fit and clears
        // after the back-off (shortened here by the 1 s budget)
        ring.write_cmd(&big, CmdKind::Generic);
        ring.write_cmd(&big, CmdKind::Generic);
        ring.write_cmd(&big, CmdKind::Generic);
        let start = std::time::Instant::now();
        let ok = ring.write_cmd(&big, CmdKind::Generic);
        assert!(!ok);
        assert!(start.elapsed().as_millis() >= 900);
        // the ring now contains only the last command
        assert_eq!(ring.read_cmd().unwrap().len(), 4000);
        assert!(ring.read_cmd().is_none());
    }
}
