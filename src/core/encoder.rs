//! Zero-copy field encoder
//!
//! Builds the structured field block of one log record directly into a byte
//! buffer. The output is JSON-flavored with some extra literal forms:
//!
//! 1. unquoted keys matching the identifier grammar
//! 2. literal complex numbers, e.g. `1.5+2i`, `2i`
//! 3. literal durations, e.g. `1s`, `1.2ms`
//! 4. literal `nil`
//! 5. byte sequences as a bare hex run starting with `0x`

use std::io::Write;
use std::time::Duration;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Keys made of letters, digits and `_ - . # $ /` are written unquoted;
/// anything else is JSON-string-quoted.
fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| matches!(c, '_' | '-' | '.' | '#' | '$' | '/') || c.is_alphanumeric())
}

#[derive(Default)]
pub(crate) struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub(crate) fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }

    pub(crate) fn write_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Writes the field separator (`{` before the first field, `,` after),
    /// the key (unquoted when identifier-safe) and the `:` delimiter.
    pub(crate) fn encode_key(&mut self, key: &str) {
        if self.buf.is_empty() {
            self.buf.push(b'{');
        } else {
            self.buf.push(b',');
        }
        if is_ident(key) {
            self.buf.extend_from_slice(key.as_bytes());
        } else {
            self.encode_str(key);
        }
        self.buf.push(b':');
    }

    /// Closes the field block. No-op when no field was written, so a
    /// field-less record is just its message.
    pub(crate) fn finish(&mut self) {
        if !self.buf.is_empty() {
            self.buf.extend_from_slice(b"} ");
        }
    }

    pub(crate) fn encode_nil(&mut self) {
        self.buf.extend_from_slice(b"nil");
    }

    pub(crate) fn encode_byte(&mut self, c: u8) {
        self.buf.push(b'\'');
        self.buf.push(c);
        self.buf.push(b'\'');
    }

    pub(crate) fn encode_char(&mut self, c: char) {
        let _ = write!(self.buf, "{:?}", c);
    }

    /// JSON-style quoting: `"`, `\` and control characters escaped,
    /// everything else verbatim.
    pub(crate) fn encode_str(&mut self, s: &str) {
        self.buf.push(b'"');
        for c in s.chars() {
            match c {
                '"' => self.buf.extend_from_slice(b"\\\""),
                '\\' => self.buf.extend_from_slice(b"\\\\"),
                '\n' => self.buf.extend_from_slice(b"\\n"),
                '\r' => self.buf.extend_from_slice(b"\\r"),
                '\t' => self.buf.extend_from_slice(b"\\t"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.buf, "\\u{:04x}", c as u32);
                }
                c => {
                    let mut tmp = [0u8; 4];
                    self.buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
                }
            }
        }
        self.buf.push(b'"');
    }

    pub(crate) fn encode_int(&mut self, v: i64) {
        if v < 0 {
            self.buf.push(b'-');
        }
        self.encode_uint(v.unsigned_abs());
    }

    pub(crate) fn encode_uint(&mut self, v: u64) {
        let mut tmp = [0u8; 20];
        let n = tmp.len();
        let w = fmt_int(&mut tmp, n, v);
        self.buf.extend_from_slice(&tmp[w..]);
    }

    // Shortest round-trippable decimal, fixed notation. `Display` for
    // floats never produces an exponent.
    pub(crate) fn encode_float32(&mut self, f: f32) {
        let _ = write!(self.buf, "{}", f);
    }

    pub(crate) fn encode_float64(&mut self, f: f64) {
        let _ = write!(self.buf, "{}", f);
    }

    pub(crate) fn encode_bool(&mut self, v: bool) {
        self.buf.extend_from_slice(if v { b"true" } else { b"false" });
    }

    pub(crate) fn encode_complex64(&mut self, re: f32, im: f32) {
        if re != 0.0 {
            self.encode_float32(re);
        }
        if im != 0.0 {
            if re != 0.0 {
                self.buf.push(b'+');
            }
            self.encode_float32(im);
            self.buf.push(b'i');
        } else if re == 0.0 {
            self.buf.push(b'0');
        }
    }

    pub(crate) fn encode_complex128(&mut self, re: f64, im: f64) {
        if re != 0.0 {
            self.encode_float64(re);
        }
        if im != 0.0 {
            if re != 0.0 {
                self.buf.push(b'+');
            }
            self.encode_float64(im);
            self.buf.push(b'i');
        } else if re == 0.0 {
            self.buf.push(b'0');
        }
    }

    /// Byte sequences render as one bare lowercase-hex run, no brackets.
    pub(crate) fn encode_bytes(&mut self, s: &[u8]) {
        self.buf.extend_from_slice(b"0x");
        for &b in s {
            self.buf.push(HEX[(b >> 4) as usize]);
            self.buf.push(HEX[(b & 0xF) as usize]);
        }
    }

    /// Bracketed comma-separated sequence; each element encoded by `f`.
    pub(crate) fn encode_slice<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.buf.push(b'[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.push(b',');
            }
            f(self, item);
        }
        self.buf.push(b']');
    }

    pub(crate) fn encode_duration(&mut self, d: Duration) {
        format_duration(&mut self.buf, d);
    }

    /// Timestamps are always quoted regardless of layout.
    pub(crate) fn encode_time(&mut self, rendered: impl std::fmt::Display) {
        self.buf.push(b'"');
        let _ = write!(self.buf, "{}", rendered);
        self.buf.push(b'"');
    }
}

/// Renders `d` in the form `72h3m0.5s`: leading zero units omitted,
/// fractional seconds with trailing zeros trimmed. Durations under one
/// second use a single smaller unit (`ms`, `µs`, `ns`) so the leading
/// digit is non-zero. The zero duration renders as `0s`.
pub(crate) fn format_duration(out: &mut Vec<u8>, d: Duration) {
    const SECOND: u64 = 1_000_000_000;
    const MILLISECOND: u64 = 1_000_000;
    const MICROSECOND: u64 = 1_000;

    // Largest representable value is "584942417355h7m15.999999999s".
    let mut buf = [0u8; 32];
    let mut w = buf.len();
    let mut u = d.as_nanos().min(u128::from(u64::MAX)) as u64;

    if u < SECOND {
        if u == 0 {
            out.extend_from_slice(b"0s");
            return;
        }
        w -= 1;
        buf[w] = b's';
        let prec;
        if u < MICROSECOND {
            prec = 0;
            w -= 1;
            buf[w] = b'n';
        } else if u < MILLISECOND {
            prec = 3;
            // U+00B5 micro sign, two bytes
            w -= 2;
            buf[w..w + 2].copy_from_slice("µ".as_bytes());
        } else {
            prec = 6;
            w -= 1;
            buf[w] = b'm';
        }
        let (nw, nu) = fmt_frac(&mut buf, w, u, prec);
        w = fmt_int(&mut buf, nw, nu);
    } else {
        w -= 1;
        buf[w] = b's';

        let (nw, nu) = fmt_frac(&mut buf, w, u, 9);
        w = nw;
        u = nu;

        // u is now integer seconds
        w = fmt_int(&mut buf, w, u % 60);
        u /= 60;

        // u is now integer minutes
        if u > 0 {
            w -= 1;
            buf[w] = b'm';
            w = fmt_int(&mut buf, w, u % 60);
            u /= 60;

            // u is now integer hours; stop here because days vary in length
            if u > 0 {
                w -= 1;
                buf[w] = b'h';
                w = fmt_int(&mut buf, w, u);
            }
        }
    }

    out.extend_from_slice(&buf[w..]);
}

/// Writes the fraction of `v / 10**prec` (e.g. `.12345`) ending at index
/// `w`, omitting trailing zeros and the decimal point when the fraction is
/// zero. Returns the index where output begins and `v / 10**prec`.
fn fmt_frac(buf: &mut [u8], mut w: usize, mut v: u64, prec: u32) -> (usize, u64) {
    let mut print = false;
    for _ in 0..prec {
        let digit = v % 10;
        print = print || digit != 0;
        if print {
            w -= 1;
            buf[w] = b'0' + digit as u8;
        }
        v /= 10;
    }
    if print {
        w -= 1;
        buf[w] = b'.';
    }
    (w, v)
}

/// Writes `v` ending at index `w`; returns the index where output begins.
pub(crate) fn fmt_int(buf: &mut [u8], mut w: usize, mut v: u64) -> usize {
    if v == 0 {
        w -= 1;
        buf[w] = b'0';
    } else {
        while v > 0 {
            w -= 1;
            buf[w] = b'0' + (v % 10) as u8;
            v /= 10;
        }
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut Encoder)) -> String {
        let mut enc = Encoder::default();
        f(&mut enc);
        String::from_utf8(enc.as_bytes().to_vec()).expect("encoder output is UTF-8")
    }

    #[test]
    fn test_ints() {
        assert_eq!(encoded(|e| e.encode_int(-12345678)), "-12345678");
        assert_eq!(encoded(|e| e.encode_int(0)), "0");
        assert_eq!(encoded(|e| e.encode_int(i64::MIN)), "-9223372036854775808");
        assert_eq!(encoded(|e| e.encode_uint(12345678900)), "12345678900");
        assert_eq!(encoded(|e| e.encode_uint(u64::MAX)), "18446744073709551615");
    }

    #[test]
    fn test_floats() {
        assert_eq!(encoded(|e| e.encode_float32(1234.5678)), "1234.5677");
        assert_eq!(encoded(|e| e.encode_float64(0.123456789)), "0.123456789");
        assert_eq!(encoded(|e| e.encode_float64(-1.5)), "-1.5");
        assert_eq!(encoded(|e| e.encode_float64(3.0)), "3");
    }

    #[test]
    fn test_complex() {
        assert_eq!(encoded(|e| e.encode_complex64(1.0, 2.0)), "1+2i");
        assert_eq!(encoded(|e| e.encode_complex128(1.0, 0.0)), "1");
        assert_eq!(encoded(|e| e.encode_complex128(0.0, 2.0)), "2i");
        assert_eq!(encoded(|e| e.encode_complex128(0.0, 0.0)), "0");
        assert_eq!(encoded(|e| e.encode_complex128(1.5, 2.0)), "1.5+2i");
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(encoded(|e| e.encode_str("hello")), r#""hello""#);
        assert_eq!(encoded(|e| e.encode_str("a\"b")), r#""a\"b""#);
        assert_eq!(encoded(|e| e.encode_str("a\\b")), r#""a\\b""#);
        assert_eq!(encoded(|e| e.encode_str("a\nb\tc")), r#""a\nb\tc""#);
        assert_eq!(encoded(|e| e.encode_str("\u{1}")), "\"\\u0001\"");
    }

    #[test]
    fn test_keys() {
        assert_eq!(
            encoded(|e| {
                e.encode_key("$name");
                e.encode_str("hello");
            }),
            r#"{$name:"hello""#
        );
        assert_eq!(
            encoded(|e| {
                e.encode_key("name of");
                e.encode_str("hello");
            }),
            r#"{"name of":"hello""#
        );
        assert_eq!(
            encoded(|e| {
                e.encode_key("a");
                e.encode_int(1);
                e.encode_key("b");
                e.encode_int(2);
                e.finish();
            }),
            "{a:1,b:2} "
        );
    }

    #[test]
    fn test_finish_without_fields() {
        assert_eq!(encoded(|e| e.finish()), "");
    }

    #[test]
    fn test_bytes() {
        assert_eq!(encoded(|e| e.encode_bytes(b"13x")), "0x313378");
        assert_eq!(encoded(|e| e.encode_bytes(&[])), "0x");
    }

    #[test]
    fn test_slices() {
        assert_eq!(
            encoded(|e| e.encode_slice(&[1i64, 3, 5], |e, v| e.encode_int(*v))),
            "[1,3,5]"
        );
        assert_eq!(
            encoded(|e| e.encode_slice(&["x", "x y", "z"], |e, v| e.encode_str(v))),
            r#"["x","x y","z"]"#
        );
        assert_eq!(
            encoded(|e| e.encode_slice::<i64>(&[], |e, v| e.encode_int(*v))),
            "[]"
        );
    }

    #[test]
    fn test_duration_grammar() {
        let cases: &[(u64, &str)] = &[
            (0, "0s"),
            (1, "1ns"),
            (100, "100ns"),
            (1_000, "1µs"),
            (2_000, "2µs"),
            (1_100, "1.1µs"),
            (1_000_000, "1ms"),
            (1_500_000, "1.5ms"),
            (1_000_000_000, "1s"),
            (1_200_000_000, "1.2s"),
            (90_000_000_000, "1m30s"),
            (3_723_000_000_000, "1h2m3s"),
            (3_600_000_000_000 * 72 + 180_000_000_000 + 500_000_000, "72h3m0.5s"),
            (1_234_567_890_000, "20m34.56789s"),
        ];
        for &(nanos, want) in cases {
            assert_eq!(
                encoded(|e| e.encode_duration(Duration::from_nanos(nanos))),
                want,
                "duration {}ns",
                nanos
            );
        }
    }

    #[test]
    fn test_ident_grammar() {
        assert!(is_ident("abc_123"));
        assert!(is_ident("$name"));
        assert!(is_ident("a-b.c#d/e"));
        assert!(!is_ident(""));
        assert!(!is_ident("name of"));
        assert!(!is_ident("a:b"));
    }
}
