//! Dynamically-typed field values
//!
//! [`Value`] is the closed set of shapes accepted by
//! [`Recorder::any`](crate::Recorder::any). Anything outside this set goes
//! through the explicit `display`/`debug` recorder methods instead, so
//! encoding a `Value` can never fail.

use std::borrow::Cow;
use std::time::Duration;

use crate::core::encoder::Encoder;

#[derive(Debug, Clone)]
pub enum Value<'a> {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    Duration(Duration),
}

impl Value<'_> {
    pub(crate) fn encode(&self, enc: &mut Encoder) {
        match self {
            Value::Nil => enc.encode_nil(),
            Value::Bool(v) => enc.encode_bool(*v),
            Value::Int(v) => enc.encode_int(*v),
            Value::Uint(v) => enc.encode_uint(*v),
            Value::F32(v) => enc.encode_float32(*v),
            Value::F64(v) => enc.encode_float64(*v),
            Value::Char(v) => enc.encode_char(*v),
            Value::Str(v) => enc.encode_str(v),
            Value::Bytes(v) => enc.encode_bytes(v),
            Value::Duration(v) => enc.encode_duration(*v),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Value<'_> {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        }
    )*};
}

macro_rules! value_from_uint {
    ($($t:ty),*) => {$(
        impl From<$t> for Value<'_> {
            fn from(v: $t) -> Self {
                Value::Uint(v as u64)
            }
        }
    )*};
}

value_from_int!(i8, i16, i32, i64, isize);
value_from_uint!(u8, u16, u32, u64, usize);

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<char> for Value<'_> {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Str(Cow::Borrowed(v))
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Value::Str(Cow::Owned(v))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(v))
    }
}

impl From<Duration> for Value<'_> {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Nil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(v: Value<'_>) -> String {
        let mut enc = Encoder::default();
        v.encode(&mut enc);
        String::from_utf8(enc.as_bytes().to_vec()).expect("encoder output is UTF-8")
    }

    #[test]
    fn test_conversions() {
        assert_eq!(rendered(Value::from(-7i32)), "-7");
        assert_eq!(rendered(Value::from(7u16)), "7");
        assert_eq!(rendered(Value::from(true)), "true");
        assert_eq!(rendered(Value::from("hi")), r#""hi""#);
        assert_eq!(rendered(Value::from(b"13x".as_slice())), "0x313378");
        assert_eq!(rendered(Value::from(Duration::from_millis(1500))), "1.5s");
    }

    #[test]
    fn test_option_maps_none_to_nil() {
        assert_eq!(rendered(Value::from(None::<i64>)), "nil");
        assert_eq!(rendered(Value::from(Some(5i64))), "5");
    }
}
