use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// A single row returned by a query.
pub type Row = Vec<Value>;

/// A single cell returned by the database.
///
/// Values have a total order so that rows can be sorted and compared as
/// multisets: `Null` sorts first, then numbers (integers and reals compared
/// numerically), then text, then blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// A 64-bit integer.
    Integer(i64),
    /// A floating point number.
    Real(f64),
    /// A text value.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl Value {
    /// Rank of the storage class, used to order values of different kinds.
    fn class_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Real(_) => 1,
            Value::Text(_) => 2,
            Value::Blob(_) => 3,
        }
    }

    /// Returns true if this value is SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// `2^63`, the first real above every `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Compares two reals numerically. Both zeros are equal; NaNs sort after
/// every number when positive and before every number when negative.
fn cmp_real(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Compares an integer against a real exactly, without rounding the integer
/// through `f64`.
fn cmp_int_real(i: i64, r: f64) -> Ordering {
    if r.is_nan() {
        return if r.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if r >= I64_BOUND {
        return Ordering::Less;
    }
    if r < -I64_BOUND {
        return Ordering::Greater;
    }

    // `whole` is integral and inside the i64 range, so the cast is exact
    let whole = r.trunc();
    i.cmp(&(whole as i64))
        .then_with(|| whole.partial_cmp(&r).unwrap_or(Ordering::Equal))
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => cmp_real(*a, *b),
            (Value::Integer(a), Value::Real(b)) => cmp_int_real(*a, *b),
            (Value::Real(a), Value::Integer(b)) => cmp_int_real(*b, *a).reverse(),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            _ => self.class_rank().cmp(&other.class_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
