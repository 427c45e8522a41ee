use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of snapshots the history keeps, always in `[MIN, MAX]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RetentionLimit(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("retention limit {0} is outside {min}..={max}", min = RetentionLimit::MIN, max = RetentionLimit::MAX)]
pub struct LimitOutOfRange(pub i64);

impl RetentionLimit {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 99_999;
    pub const DEFAULT: RetentionLimit = RetentionLimit(1000);

    pub fn new(value: i64) -> Result<Self, LimitOutOfRange> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(RetentionLimit(value as u32))
        } else {
            Err(LimitOutOfRange(value))
        }
    }

    /// Forces `value` into range.
    pub fn clamped(value: i64) -> Self {
        RetentionLimit(value.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
    }

    /// Strict parse of user input: a plain integer within range.
    pub fn parse(input: &str) -> Option<Self> {
        input.trim().parse::<i64>().ok().and_then(|n| Self::new(n).ok())
    }

    /// Reads the persisted scalar (an integer string, or a bare number).
    /// Anything absent, unparseable or out of range yields `fallback`.
    pub fn from_persisted(value: Option<&Value>, fallback: RetentionLimit) -> Self {
        let parsed = match value {
            Some(Value::String(text)) => Self::parse(text),
            Some(Value::Number(number)) => number.as_i64().and_then(|n| Self::new(n).ok()),
            _ => None,
        };
        parsed.unwrap_or(fallback)
    }

    pub fn to_persisted(self) -> Value {
        Value::String(self.0.to_string())
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for RetentionLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for RetentionLimit {
    type Error = LimitOutOfRange;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value as i64)
    }
}

impl From<RetentionLimit> for u32 {
    fn from(limit: RetentionLimit) -> Self {
        limit.0
    }
}

impl fmt::Display for RetentionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
