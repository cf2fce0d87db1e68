//! Chained field builder
//!
//! A [`Recorder`] is handed out by [`Logger::log`](crate::Logger::log) and
//! friends. When the record's level clears the logger threshold it carries
//! a pooled encoder; otherwise it is inert and every chained call is a
//! guaranteed no-op, so call sites never branch on the level themselves.
//!
//! ```
//! use kvlog::LoggerBuilder;
//!
//! let logger = LoggerBuilder::new().build().unwrap();
//! logger
//!     .info()
//!     .string("listen", "0.0.0.0:8080")
//!     .int("workers", 8)
//!     .print("server started");
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeZone};
use parking_lot::Mutex;

use crate::core::encoder::Encoder;
use crate::core::level::Level;
use crate::core::printer::{Caller, Print};
use crate::core::value::Value;

/// Encoders above this capacity are dropped instead of pooled.
const MAX_POOLED_ENCODER: usize = 1024;

static ENCODER_POOL: Mutex<Vec<Encoder>> = Mutex::new(Vec::new());

fn acquire_encoder() -> Encoder {
    match ENCODER_POOL.lock().pop() {
        Some(mut enc) => {
            enc.clear();
            enc
        }
        None => Encoder::default(),
    }
}

fn release_encoder(enc: Encoder) {
    if enc.capacity() < MAX_POOLED_ENCODER {
        ENCODER_POOL.lock().push(enc);
    }
}

struct RecorderInner {
    printer: Arc<dyn Print>,
    level: Level,
    flags: u32,
    prefix: Arc<str>,
    encoder: Encoder,
}

pub struct Recorder {
    inner: Option<RecorderInner>,
}

impl Recorder {
    pub(crate) fn inert() -> Self {
        Recorder { inner: None }
    }

    pub(crate) fn live(printer: Arc<dyn Print>, level: Level, flags: u32, prefix: Arc<str>) -> Self {
        Recorder {
            inner: Some(RecorderInner {
                printer,
                level,
                flags,
                prefix,
                encoder: acquire_encoder(),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_inert(&self) -> bool {
        self.inner.is_none()
    }

    #[cfg(test)]
    fn rendered(mut self) -> String {
        match self.inner.take() {
            Some(mut inner) => {
                inner.encoder.finish();
                String::from_utf8(inner.encoder.as_bytes().to_vec())
                    .expect("encoder output is UTF-8")
            }
            None => String::new(),
        }
    }

    fn field(mut self, key: &str, encode: impl FnOnce(&mut Encoder)) -> Self {
        if let Some(inner) = &mut self.inner {
            inner.encoder.encode_key(key);
            encode(&mut inner.encoder);
        }
        self
    }

    pub fn int(self, key: &str, value: impl Into<i64>) -> Self {
        self.field(key, |e| e.encode_int(value.into()))
    }

    pub fn uint(self, key: &str, value: impl Into<u64>) -> Self {
        self.field(key, |e| e.encode_uint(value.into()))
    }

    pub fn float32(self, key: &str, value: f32) -> Self {
        self.field(key, |e| e.encode_float32(value))
    }

    pub fn float64(self, key: &str, value: f64) -> Self {
        self.field(key, |e| e.encode_float64(value))
    }

    pub fn complex64(self, key: &str, re: f32, im: f32) -> Self {
        self.field(key, |e| e.encode_complex64(re, im))
    }

    pub fn complex128(self, key: &str, re: f64, im: f64) -> Self {
        self.field(key, |e| e.encode_complex128(re, im))
    }

    pub fn byte(self, key: &str, value: u8) -> Self {
        self.field(key, |e| e.encode_byte(value))
    }

    pub fn char(self, key: &str, value: char) -> Self {
        self.field(key, |e| e.encode_char(value))
    }

    pub fn bool(self, key: &str, value: bool) -> Self {
        self.field(key, |e| e.encode_bool(value))
    }

    pub fn string(self, key: &str, value: impl AsRef<str>) -> Self {
        self.field(key, |e| e.encode_str(value.as_ref()))
    }

    /// Absent errors render as a bare `nil`.
    pub fn error(self, key: &str, value: Option<&dyn std::error::Error>) -> Self {
        self.field(key, |e| match value {
            Some(err) => e.encode_str(&err.to_string()),
            None => e.encode_nil(),
        })
    }

    pub fn any<'a>(self, key: &str, value: impl Into<Value<'a>>) -> Self {
        let value = value.into();
        self.field(key, |e| value.encode(e))
    }

    /// Quoted `Display` rendering, for types outside the [`Value`] set.
    pub fn display(self, key: &str, value: &impl fmt::Display) -> Self {
        if self.inner.is_some() {
            let s = value.to_string();
            self.field(key, |e| e.encode_str(&s))
        } else {
            self
        }
    }

    /// Quoted `Debug` rendering.
    pub fn debug(self, key: &str, value: &impl fmt::Debug) -> Self {
        if self.inner.is_some() {
            let s = format!("{:?}", value);
            self.field(key, |e| e.encode_str(&s))
        } else {
            self
        }
    }

    /// Records the static type name of `value`.
    pub fn type_of<T: ?Sized>(self, key: &str, _value: &T) -> Self {
        self.field(key, |e| e.encode_str(std::any::type_name::<T>()))
    }

    /// Lazily computed string field; `f` runs only when the record is live.
    pub fn exec(self, key: &str, f: impl FnOnce() -> String) -> Self {
        if self.inner.is_some() {
            let s = f();
            self.field(key, |e| e.encode_str(&s))
        } else {
            self
        }
    }

    pub fn date<Tz: TimeZone>(self, key: &str, value: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        self.field(key, |e| e.encode_time(value.format("%Y-%m-%d%:z")))
    }

    /// RFC 3339 with fractional seconds trimmed to the coarsest exact
    /// representation.
    pub fn time<Tz: TimeZone>(self, key: &str, value: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        self.field(key, |e| {
            e.encode_time(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        })
    }

    pub fn seconds<Tz: TimeZone>(self, key: &str, value: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        self.field(key, |e| {
            e.encode_time(value.to_rfc3339_opts(SecondsFormat::Secs, true))
        })
    }

    pub fn milliseconds<Tz: TimeZone>(self, key: &str, value: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        self.field(key, |e| {
            e.encode_time(value.to_rfc3339_opts(SecondsFormat::Millis, true))
        })
    }

    pub fn microseconds<Tz: TimeZone>(self, key: &str, value: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        self.field(key, |e| {
            e.encode_time(value.to_rfc3339_opts(SecondsFormat::Micros, true))
        })
    }

    pub fn duration(self, key: &str, value: Duration) -> Self {
        self.field(key, |e| e.encode_duration(value))
    }

    pub fn ints<T: Copy + Into<i64>>(self, key: &str, values: &[T]) -> Self {
        self.field(key, |e| {
            e.encode_slice(values, |e, v| e.encode_int((*v).into()))
        })
    }

    pub fn uints<T: Copy + Into<u64>>(self, key: &str, values: &[T]) -> Self {
        self.field(key, |e| {
            e.encode_slice(values, |e, v| e.encode_uint((*v).into()))
        })
    }

    pub fn float32s(self, key: &str, values: &[f32]) -> Self {
        self.field(key, |e| {
            e.encode_slice(values, |e, v| e.encode_float32(*v))
        })
    }

    pub fn float64s(self, key: &str, values: &[f64]) -> Self {
        self.field(key, |e| {
            e.encode_slice(values, |e, v| e.encode_float64(*v))
        })
    }

    pub fn complex64s(self, key: &str, values: &[(f32, f32)]) -> Self {
        self.field(key, |e| {
            e.encode_slice(values, |e, (re, im)| e.encode_complex64(*re, *im))
        })
    }

    pub fn complex128s(self, key: &str, values: &[(f64, f64)]) -> Self {
        self.field(key, |e| {
            e.encode_slice(values, |e, (re, im)| e.encode_complex128(*re, *im))
        })
    }

    pub fn bools(self, key: &str, values: &[bool]) -> Self {
        self.field(key, |e| e.encode_slice(values, |e, v| e.encode_bool(*v)))
    }

    pub fn strings<S: AsRef<str>>(self, key: &str, values: &[S]) -> Self {
        self.field(key, |e| {
            e.encode_slice(values, |e, v| e.encode_str(v.as_ref()))
        })
    }

    /// Byte sequences render as one `0x` hex run, not a bracketed list.
    pub fn bytes(self, key: &str, value: &[u8]) -> Self {
        self.field(key, |e| e.encode_bytes(value))
    }

    /// Terminal call: closes the field block, appends the message and hands
    /// the record to the pipeline. The recorder is consumed; the inert
    /// recorder discards everything.
    #[track_caller]
    pub fn print(mut self, msg: &str) {
        let caller = Caller::here();
        if let Some(mut inner) = self.inner.take() {
            inner.encoder.finish();
            inner.encoder.write_str(msg);
            inner.printer.print(
                inner.level,
                inner.flags,
                caller,
                &inner.prefix,
                inner.encoder.as_bytes(),
            );
            release_encoder(inner.encoder);
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Chains abandoned without print() still return their encoder.
        if let Some(inner) = self.inner.take() {
            release_encoder(inner.encoder);
        }
    }
}
