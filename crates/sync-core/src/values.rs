//! Value representations for captured rows.
//!
//! A queue entry's payload is a point-in-time snapshot of the local row:
//! the same column set and types as the row's public representation,
//! restricted to scalars. It is stored as JSON text and replayed as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Snapshot of one row: column name to scalar value.
///
/// A `BTreeMap` keeps column iteration order stable, so statements built
/// from the same snapshot are always byte-identical.
pub type RowSnapshot = BTreeMap<String, ColumnValue>;

/// Scalar column value as found in a row snapshot.
///
/// Decoding is untagged: a JSON number that fits `i64` becomes `Integer`,
/// any other number (fractional, or an integer outside the `i64` range)
/// becomes `Real` and may lose precision. Snapshots written by the queue
/// only ever hold `i64` integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// SQL NULL
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Real(f64),

    /// Text value
    Text(String),
}

impl ColumnValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as an integer.
    ///
    /// Booleans map to 0/1; reals are accepted only when they carry no fraction
    /// and fit the `i64` range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Real(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            Self::Text(s) => s.trim().parse().ok(),
            Self::Real(_) | Self::Null => None,
        }
    }

    /// Decode a snapshot from its serialized payload.
    pub fn decode_snapshot(payload: &str) -> serde_json::Result<RowSnapshot> {
        serde_json::from_str(payload)
    }

    /// Encode a snapshot into its serialized payload.
    pub fn encode_snapshot(snapshot: &RowSnapshot) -> serde_json::Result<String> {
        serde_json::to_string(snapshot)
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}
