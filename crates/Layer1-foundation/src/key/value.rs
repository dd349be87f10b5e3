//! Argument values and their normalized, hashable form

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::CacheKey;

/// A call argument as handed over by the wrapping layer
///
/// This is the dynamic boundary type: anything a memoized callable takes as
/// input is described as an `ArgValue` before key construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Ordered sequence (lists, tuples, arrays)
    Seq(Vec<ArgValue>),
    /// Mapping as key/value pairs, in any order
    Map(Vec<(ArgValue, ArgValue)>),
    /// Result of a memoized call, carrying the key that produced it
    Tracked(CacheKey),
    /// A value with no hashable representation
    Unhashable(String),
}

impl ArgValue {
    /// Raw bytes (a `Vec<u8>` converts to a sequence otherwise)
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        ArgValue::Bytes(data.into())
    }

    /// Placeholder for a value of type `T` that cannot be hashed
    pub fn opaque<T: ?Sized>() -> Self {
        ArgValue::Unhashable(format!("values of type {} have no hashable form", std::any::type_name::<T>()))
    }

    /// Convert any serializable value through its JSON data model
    ///
    /// Serialization failures do not fail here; they surface as
    /// `NotHashable` for the parameter this value ends up bound to.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => ArgValue::from(json),
            Err(e) => ArgValue::Unhashable(e.to_string()),
        }
    }

    /// Normalize into the closed hashable form
    ///
    /// On failure returns a reason describing where inside the value the
    /// problem sits.
    pub fn normalize(&self) -> std::result::Result<NormalizedValue, String> {
        match self {
            ArgValue::Null => Ok(NormalizedValue::Null),
            ArgValue::Bool(b) => Ok(NormalizedValue::Bool(*b)),
            ArgValue::Int(i) => Ok(NormalizedValue::Int(*i)),
            ArgValue::UInt(u) => Ok(match i64::try_from(*u) {
                Ok(i) => NormalizedValue::Int(i),
                Err(_) => NormalizedValue::UInt(*u),
            }),
            ArgValue::Float(f) => normalize_float(*f),
            ArgValue::Str(s) => Ok(NormalizedValue::Str(s.clone())),
            ArgValue::Bytes(b) => Ok(NormalizedValue::Bytes(b.clone())),
            ArgValue::Seq(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| item.normalize().map_err(|e| format!("element {}: {}", i, e)))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(NormalizedValue::Seq),
            ArgValue::Map(pairs) => {
                // Sorted so that equal mappings normalize equally whatever
                // their iteration order; a repeated key keeps its last value.
                let mut sorted = BTreeMap::new();
                for (k, v) in pairs {
                    let nk = k.normalize().map_err(|e| format!("mapping key: {}", e))?;
                    let nv = v
                        .normalize()
                        .map_err(|e| format!("mapping value for {}: {}", nk, e))?;
                    sorted.insert(nk, nv);
                }
                Ok(NormalizedValue::Pairs(sorted.into_iter().collect()))
            }
            ArgValue::Tracked(key) => Ok(NormalizedValue::Key(Box::new(key.clone()))),
            ArgValue::Unhashable(reason) => Err(reason.clone()),
        }
    }
}

fn normalize_float(f: f64) -> std::result::Result<NormalizedValue, String> {
    if f.is_nan() {
        return Err("NaN is not equal to itself".to_string());
    }
    // -0.0 == 0.0, so both must hash the same
    let f = if f == 0.0 { 0.0 } else { f };
    Ok(NormalizedValue::Float(f.to_bits()))
}

/// Normalized, totally ordered, hashable argument value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Only for values above `i64::MAX`
    UInt(u64),
    /// IEEE-754 bits
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<NormalizedValue>),
    /// Mapping entries sorted by key
    Pairs(Vec<(NormalizedValue, NormalizedValue)>),
    /// Origin key of a tracked result, nested as one unit
    Key(Box<CacheKey>),
}

impl std::fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizedValue::Null => write!(f, "null"),
            NormalizedValue::Bool(b) => write!(f, "{}", b),
            NormalizedValue::Int(i) => write!(f, "{}", i),
            NormalizedValue::UInt(u) => write!(f, "{}", u),
            NormalizedValue::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            NormalizedValue::Str(s) => write!(f, "{:?}", s),
            NormalizedValue::Bytes(b) => write!(f, "b\"{}\"", hex::encode(b)),
            NormalizedValue::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            NormalizedValue::Pairs(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            NormalizedValue::Key(key) => write!(f, "{}", key),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for ArgValue {
            fn from(v: $t) -> Self {
                ArgValue::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for ArgValue {
            fn from(v: $t) -> Self {
                ArgValue::UInt(v as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<f32> for ArgValue {
    fn from(v: f32) -> Self {
        ArgValue::Float(v as f64)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<()> for ArgValue {
    fn from(_: ()) -> Self {
        ArgValue::Null
    }
}

impl From<char> for ArgValue {
    fn from(v: char) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<&String> for ArgValue {
    fn from(v: &String) -> Self {
        ArgValue::Str(v.clone())
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ArgValue::Null, Into::into)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(v: Vec<T>) -> Self {
        ArgValue::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<ArgValue>> From<&[T]> for ArgValue {
    fn from(v: &[T]) -> Self {
        ArgValue::Seq(v.iter().cloned().map(Into::into).collect())
    }
}

impl<K: Into<ArgValue>, V: Into<ArgValue>, S> From<HashMap<K, V, S>> for ArgValue {
    fn from(v: HashMap<K, V, S>) -> Self {
        ArgValue::Map(v.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<ArgValue>, V: Into<ArgValue>> From<BTreeMap<K, V>> for ArgValue {
    fn from(v: BTreeMap<K, V>) -> Self {
        ArgValue::Map(v.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<A: Into<ArgValue>, B: Into<ArgValue>> From<(A, B)> for ArgValue {
    fn from((a, b): (A, B)) -> Self {
        ArgValue::Seq(vec![a.into(), b.into()])
    }
}

impl<A: Into<ArgValue>, B: Into<ArgValue>, C: Into<ArgValue>> From<(A, B, C)> for ArgValue {
    fn from((a, b, c): (A, B, C)) -> Self {
        ArgValue::Seq(vec![a.into(), b.into(), c.into()])
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;

        match v {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ArgValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ArgValue::UInt(u)
                } else {
                    ArgValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => ArgValue::Str(s),
            Value::Array(items) => ArgValue::Seq(items.into_iter().map(ArgValue::from).collect()),
            Value::Object(obj) => ArgValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (ArgValue::Str(k), ArgValue::from(v)))
                    .collect(),
            ),
        }
    }
}
