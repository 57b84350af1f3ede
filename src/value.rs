//! The typed parameter values a log call can carry, in place of C varargs.

use core::fmt;

/// One formatted-log parameter. The format string's specifier (`%d`, `%x`, `%s`, ...)
/// determines how a given variant is rendered; mismatches are reported as
/// [`crate::format::FormatError::TypeMismatch`] rather than silently coerced.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    I32(i32),
    U32(u32),
    F32(f32),
    Char(char),
    Str(&'a str),
    Ptr(usize),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Ptr(v) => write!(f, "{:p}", *v as *const ()),
        }
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<u32> for Value<'_> {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<char> for Value<'_> {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Str(v)
    }
}
