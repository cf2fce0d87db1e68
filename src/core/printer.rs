//! Log pipeline core
//!
//! A [`Printer`] owns the sink, the entry pool and (in async mode) the
//! pending-write queue plus one background consumer thread. Producers call
//! [`Print::print`]; the consumer drains the queue in FIFO order and pushes
//! bytes through the sink. Flush and shutdown are coordinated over
//! crossbeam channels so nothing queued before the request is lost.

use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{Datelike, Local, Timelike, Utc};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;

use crate::core::encoder::fmt_int;
use crate::core::entry::{Entry, EntryPool, EntryQueue};
use crate::core::error::{LoggerError, Result};
use crate::core::level::Level;
use crate::writers::Writer;

/// Header layout flags.
pub mod flags {
    /// Date and time in the header: `2001/02/03 01:23:23`.
    pub const DATETIME: u32 = 1 << 0;
    /// Microsecond resolution: `01:23:23.123123`. Only meaningful with
    /// [`DATETIME`].
    pub const MICROSECONDS: u32 = 1 << 1;
    /// Final file name element and line number: `main.rs:23`.
    /// Overrides [`LONG_FILE`].
    pub const SHORT_FILE: u32 = 1 << 2;
    /// Full file path and line number: `src/bin/main.rs:23`.
    pub const LONG_FILE: u32 = 1 << 3;
    /// Use UTC rather than the local time zone for [`DATETIME`].
    pub const UTC: u32 = 1 << 4;
    /// Default flags for new loggers.
    pub const DEFAULT: u32 = DATETIME;
}

/// Call-site information, resolved at compile time through
/// `#[track_caller]`. `line == 0` means no caller is known.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    #[track_caller]
    pub(crate) fn here() -> Caller {
        let loc = std::panic::Location::caller();
        Caller {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

/// What a logger needs from its pipeline. Implemented by [`Printer`] and by
/// the inert [`NopPrinter`] that backs writer-less loggers.
pub(crate) trait Print: Send + Sync {
    fn start(&self) -> Result<()>;
    fn shutdown(&self) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn print(&self, level: Level, flags: u32, caller: Caller, prefix: &str, msg: &[u8]);
}

const INERT: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

struct Pipeline {
    state: AtomicU8,
    queue: EntryQueue,
    flush_tx: Sender<Sender<()>>,
    flush_rx: Receiver<Sender<()>>,
    quit_tx: Sender<()>,
    quit_rx: Receiver<()>,
    // Held by the consumer thread once started; its drop disconnects
    // `done_rx`, which is how waiters observe consumer exit.
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
}

struct PrinterCore {
    writer: Mutex<Box<dyn Writer>>,
    pool: EntryPool,
    pipeline: Option<Pipeline>,
    // Sync-only printers track close separately since they have no state
    // machine to pass through.
    closed: AtomicBool,
}

pub(crate) struct Printer {
    core: Arc<PrinterCore>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Printer {
    pub(crate) fn new(writer: Box<dyn Writer>, async_mode: bool) -> Self {
        let pipeline = async_mode.then(|| {
            let (flush_tx, flush_rx) = bounded(1);
            let (quit_tx, quit_rx) = bounded(1);
            let (done_tx, done_rx) = bounded(0);
            Pipeline {
                state: AtomicU8::new(INERT),
                queue: EntryQueue::new(),
                flush_tx,
                flush_rx,
                quit_tx,
                quit_rx,
                done_tx: Mutex::new(Some(done_tx)),
                done_rx,
            }
        });
        Printer {
            core: Arc::new(PrinterCore {
                writer: Mutex::new(writer),
                pool: EntryPool::new(),
                pipeline,
                closed: AtomicBool::new(false),
            }),
            handle: Mutex::new(None),
        }
    }
}

impl PrinterCore {
    fn run(self: Arc<Self>, done: Sender<()>) {
        let Some(pl) = &self.pipeline else { return };
        loop {
            let entries = pl
                .queue
                .wait_pop_all(|| !pl.flush_rx.is_empty() || !pl.quit_rx.is_empty());
            self.write_entries(entries);
            if self.consume_signals(pl) {
                break;
            }
        }
        drop(done);
    }

    /// Handles every pending control message. Returns true on quit. Each
    /// signal drains the queue again so records enqueued before the signal
    /// are written before it is answered.
    fn consume_signals(&self, pl: &Pipeline) -> bool {
        loop {
            select! {
                recv(pl.flush_rx) -> ack => {
                    self.flush_all(pl);
                    // Dropping the ack sender releases the flusher.
                    drop(ack);
                }
                recv(pl.quit_rx) -> _ => {
                    self.flush_all(pl);
                    return true;
                }
                default => return false,
            }
        }
    }

    fn flush_all(&self, pl: &Pipeline) {
        self.write_entries(pl.queue.pop_all());
    }

    fn write_entries(&self, entries: std::collections::VecDeque<Entry>) {
        if entries.is_empty() {
            return;
        }
        let mut w = self.writer.lock();
        for e in entries {
            // Sink errors on the async path are unobservable by the
            // producer; the sink itself is where they surface.
            let _ = w.write(e.level, &e.buf, e.header);
            self.pool.release(e);
        }
    }
}

impl Print for Printer {
    fn start(&self) -> Result<()> {
        let pl = self
            .core
            .pipeline
            .as_ref()
            .ok_or_else(|| LoggerError::config("printer", "no async queue configured"))?;
        if pl
            .state
            .compare_exchange(INERT, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoggerError::AlreadyStarted);
        }
        let Some(done) = pl.done_tx.lock().take() else {
            return Err(LoggerError::AlreadyStarted);
        };
        let core = Arc::clone(&self.core);
        let handle = thread::Builder::new()
            .name("kvlog-writer".into())
            .spawn(move || core.run(done))?;
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        match &self.core.pipeline {
            Some(pl) => {
                if pl
                    .state
                    .compare_exchange(RUNNING, STOPPED, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return Ok(());
                }
                let _ = pl.quit_tx.try_send(());
                pl.queue.notify();
                // Disconnect of done_rx marks the final drain complete.
                let _ = pl.done_rx.recv();
                if let Some(handle) = self.handle.lock().take() {
                    let _ = handle.join();
                }
                self.core.writer.lock().close()
            }
            None => {
                if self.core.closed.swap(true, Ordering::AcqRel) {
                    return Ok(());
                }
                self.core.writer.lock().close()
            }
        }
    }

    fn flush(&self) -> Result<()> {
        let Some(pl) = &self.core.pipeline else {
            return Ok(());
        };
        if pl.state.load(Ordering::Acquire) != RUNNING {
            return Ok(());
        }
        let (ack_tx, ack_rx) = bounded::<()>(0);
        if pl.flush_tx.send(ack_tx).is_err() {
            return Ok(());
        }
        pl.queue.notify();
        // Either the consumer acked this flush or it exited; both mean the
        // queue as of the request has been written.
        select! {
            recv(ack_rx) -> _ => {}
            recv(pl.done_rx) -> _ => {}
        }
        Ok(())
    }

    fn print(&self, level: Level, flags: u32, caller: Caller, prefix: &str, msg: &[u8]) {
        let mut file = caller.file;
        let mut line = caller.line;
        if flags & (flags::SHORT_FILE | flags::LONG_FILE) != 0 {
            if line == 0 {
                file = "???";
            } else if flags & flags::SHORT_FILE != 0 {
                file = file.rsplit('/').next().unwrap_or(file);
            }
        } else {
            line = 0;
        }

        let mut e = self.core.pool.acquire();
        e.level = level;
        format_header(&mut e.buf, level, flags, file, line);
        e.header = e.buf.len();
        if !prefix.is_empty() {
            e.buf.push(b'(');
            e.buf.extend_from_slice(prefix.as_bytes());
            e.buf.extend_from_slice(b") ");
        }
        e.buf.extend_from_slice(msg);
        if e.buf.last() != Some(&b'\n') {
            e.buf.push(b'\n');
        }
        if level == Level::Fatal {
            append_stack_trace(&mut e.buf, &Backtrace::force_capture().to_string());
        }

        match &self.core.pipeline {
            Some(pl) if pl.state.load(Ordering::Acquire) == RUNNING => {
                pl.queue.push(e);
            }
            _ => {
                let mut w = self.core.writer.lock();
                let _ = w.write(e.level, &e.buf, e.header);
                drop(w);
                self.core.pool.release(e);
            }
        }

        if level == Level::Fatal {
            let _ = self.shutdown();
            std::process::exit(1);
        }
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Printer for loggers built without writers: accepts everything, writes
/// nothing, never exits the process.
pub(crate) struct NopPrinter;

impl Print for NopPrinter {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn print(&self, _level: Level, _flags: u32, _caller: Caller, _prefix: &str, _msg: &[u8]) {}
}

/// Appends the captured stack trace between its marker lines. Runs in the
/// formatting stage so the trace travels with the record through whichever
/// write path it takes.
fn append_stack_trace(buf: &mut Vec<u8>, trace: &str) {
    buf.extend_from_slice(b"========= BEGIN STACK TRACE =========\n");
    buf.extend_from_slice(trace.as_bytes());
    if !trace.ends_with('\n') {
        buf.push(b'\n');
    }
    buf.extend_from_slice(b"========== END STACK TRACE ==========\n");
}

fn two_digits(buf: &mut [u8], at: usize, v: u32) {
    buf[at] = b'0' + (v / 10 % 10) as u8;
    buf[at + 1] = b'0' + (v % 10) as u8;
}

fn fixed_digits(buf: &mut [u8], at: usize, width: usize, v: u32) {
    let mut v = v;
    for i in (0..width).rev() {
        buf[at + i] = b'0' + (v % 10) as u8;
        v /= 10;
    }
}

/// Writes `[<L>[ yyyy/mm/dd hh:mm:ss[.ffffff]][ file:line]] ` into `buf`.
/// Numeric fields are zero-padded and converted digit-by-digit in a stack
/// scratch array; only the file name reaches the buffer directly.
fn format_header(buf: &mut Vec<u8>, level: Level, flags: u32, file: &str, line: u32) {
    let mut tmp = [0u8; 32];
    tmp[0] = b'[';
    tmp[1] = level.tag();
    let mut off = 2;
    if flags & flags::DATETIME != 0 {
        let (y, mo, d, h, mi, s, micros) = if flags & flags::UTC != 0 {
            clock_parts(Utc::now())
        } else {
            clock_parts(Local::now())
        };
        tmp[2] = b' ';
        fixed_digits(&mut tmp, 3, 4, y);
        tmp[7] = b'/';
        two_digits(&mut tmp, 8, mo);
        tmp[10] = b'/';
        two_digits(&mut tmp, 11, d);
        tmp[13] = b' ';
        two_digits(&mut tmp, 14, h);
        tmp[16] = b':';
        two_digits(&mut tmp, 17, mi);
        tmp[19] = b':';
        two_digits(&mut tmp, 20, s);
        off = 22;
        if flags & flags::MICROSECONDS != 0 {
            tmp[off] = b'.';
            off += 1;
            fixed_digits(&mut tmp, off, 6, micros);
            off += 6;
        }
    }
    if line > 0 {
        tmp[off] = b' ';
        buf.extend_from_slice(&tmp[..off + 1]);
        buf.extend_from_slice(file.as_bytes());
        buf.push(b':');
        let mut digits = [0u8; 10];
        let n = digits.len();
        let w = fmt_int(&mut digits, n, u64::from(line));
        buf.extend_from_slice(&digits[w..]);
        buf.extend_from_slice(b"] ");
    } else {
        tmp[off] = b']';
        tmp[off + 1] = b' ';
        buf.extend_from_slice(&tmp[..off + 2]);
    }
}

fn clock_parts<T: Datelike + Timelike>(t: T) -> (u32, u32, u32, u32, u32, u32, u32) {
    (
        t.year().unsigned_abs(),
        t.month(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
        t.nanosecond() / 1_000 % 1_000_000,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(level: Level, flags: u32, file: &str, line: u32) -> String {
        let mut buf = Vec::new();
        format_header(&mut buf, level, flags, file, line);
        String::from_utf8(buf).expect("header is ASCII")
    }

    #[test]
    fn test_bare_header() {
        assert_eq!(header(Level::Info, 0, "", 0), "[I] ");
        assert_eq!(header(Level::Fatal, 0, "", 0), "[F] ");
    }

    #[test]
    fn test_header_with_caller() {
        assert_eq!(
            header(Level::Error, flags::SHORT_FILE, "main.rs", 42),
            "[E main.rs:42] "
        );
    }

    #[test]
    fn test_datetime_header_shape() {
        let h = header(Level::Debug, flags::DATETIME, "", 0);
        // [D yyyy/mm/dd hh:mm:ss]<space>
        assert_eq!(h.len(), 24);
        let b = h.as_bytes();
        assert_eq!(&b[..2], b"[D");
        assert_eq!(b[2], b' ');
        assert_eq!(b[7], b'/');
        assert_eq!(b[10], b'/');
        assert_eq!(b[13], b' ');
        assert_eq!(b[16], b':');
        assert_eq!(b[19], b':');
        assert_eq!(&b[22..], b"] ");
        assert!(h[3..7].bytes().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_microseconds_header_shape() {
        let h = header(
            Level::Info,
            flags::DATETIME | flags::MICROSECONDS | flags::UTC,
            "",
            0,
        );
        assert_eq!(h.len(), 31);
        let b = h.as_bytes();
        assert_eq!(b[22], b'.');
        assert!(h[23..29].bytes().all(|c| c.is_ascii_digit()));
        assert_eq!(&b[29..], b"] ");
    }

    #[test]
    fn test_stack_trace_framing() {
        let mut buf = b"[F] {code:7} giving up\n".to_vec();
        append_stack_trace(&mut buf, "0: main\n1: start\n");
        let out = String::from_utf8(buf).expect("trace output is UTF-8");

        assert_eq!(
            out,
            "[F] {code:7} giving up\n\
             ========= BEGIN STACK TRACE =========\n\
             0: main\n\
             1: start\n\
             ========== END STACK TRACE ==========\n"
        );
        assert_eq!(out.matches("BEGIN STACK TRACE").count(), 1);
        assert_eq!(out.matches("END STACK TRACE").count(), 1);
    }

    #[test]
    fn test_stack_trace_without_trailing_newline() {
        let mut buf = Vec::new();
        append_stack_trace(&mut buf, "0: main");
        let out = String::from_utf8(buf).expect("trace output is UTF-8");
        assert!(out.contains("0: main\n========== END STACK TRACE ==========\n"));
    }

    #[test]
    fn test_long_file_keeps_full_path() {
        assert_eq!(
            header(Level::Warn, flags::LONG_FILE, "src/bin/main.rs", 7),
            "[W src/bin/main.rs:7] "
        );
    }
}
