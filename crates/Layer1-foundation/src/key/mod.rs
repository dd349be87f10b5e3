//! Cache key construction
//!
//! A [`CacheKey`] is the normalized argument binding of one call: every
//! declared parameter, in declaration order, paired with its normalized
//! value. Calls that bind the same effective arguments produce equal keys no
//! matter whether the arguments were passed positionally, by keyword, or left
//! to their defaults.
//!
//! ## Algorithm
//!
//! 1. Start from every parameter's declared default (or nothing)
//! 2. Overlay keyword arguments by name
//! 3. Fill the remaining parameters with positional arguments, in order
//! 4. Normalize each value; results of memoized calls ([`ArgValue::Tracked`])
//!    are replaced by the key that produced them
//!
//! ```rust,ignore
//! let sig = Signature::new("math::add").param("a").param_default("b", 10);
//!
//! let k1 = build_key(&sig, &CallArgs::new().arg(5))?;
//! let k2 = build_key(&sig, &CallArgs::new().kwarg("b", 10).kwarg("a", 5))?;
//! assert_eq!(k1, k2);
//! ```

mod digest;
mod signature;
mod value;

pub use digest::key_digest;
pub use signature::{CallArgs, Param, Signature};
pub use value::{ArgValue, NormalizedValue};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Normalized, hashable argument binding of one call
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Qualified name of the callable the binding belongs to
    callable: String,
    entries: Vec<(String, NormalizedValue)>,
}

impl CacheKey {
    /// Assemble a key from already-normalized entries
    pub fn from_entries(callable: impl Into<String>, entries: Vec<(String, NormalizedValue)>) -> Self {
        Self {
            callable: callable.into(),
            entries,
        }
    }

    pub fn callable(&self) -> &str {
        &self.callable
    }

    pub fn entries(&self) -> &[(String, NormalizedValue)] {
        &self.entries
    }

    /// Normalized value bound to a parameter
    pub fn get(&self, param: &str) -> Option<&NormalizedValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, v)| v)
    }

    /// Stable hex digest, identical across processes
    pub fn digest(&self) -> String {
        key_digest(self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.callable)?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

/// Bind `args` against `signature` and normalize the result into a key
pub fn build_key(signature: &Signature, args: &CallArgs) -> Result<CacheKey> {
    signature.validate()?;

    let params = signature.params();
    let mut slots: Vec<Option<&ArgValue>> = params.iter().map(|p| p.default.as_ref()).collect();
    let mut explicit = vec![false; params.len()];

    for (name, value) in &args.keyword {
        let pos = signature.position(name).ok_or_else(|| {
            Error::binding(
                signature.name(),
                format!("unexpected keyword argument '{}'", name),
            )
        })?;
        if explicit[pos] {
            return Err(Error::binding(
                signature.name(),
                format!("multiple values for argument '{}'", name),
            ));
        }
        slots[pos] = Some(value);
        explicit[pos] = true;
    }

    let mut cursor = 0;
    for value in &args.positional {
        while cursor < params.len() && explicit[cursor] {
            cursor += 1;
        }
        if cursor == params.len() {
            return Err(Error::binding(
                signature.name(),
                format!(
                    "takes {} arguments but {} positional and {} keyword were given",
                    params.len(),
                    args.positional.len(),
                    args.keyword.len()
                ),
            ));
        }
        slots[cursor] = Some(value);
        explicit[cursor] = true;
    }

    let mut entries = Vec::with_capacity(params.len());
    for (param, slot) in params.iter().zip(slots) {
        let value = slot.ok_or_else(|| {
            Error::binding(
                signature.name(),
                format!("missing required argument '{}'", param.name),
            )
        })?;
        let normalized = value
            .normalize()
            .map_err(|reason| Error::not_hashable(&param.name, reason))?;
        entries.push((param.name.clone(), normalized));
    }

    Ok(CacheKey::from_entries(signature.name(), entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn add_sig() -> Signature {
        Signature::new("math::add").param("a").param_default("b", 10)
    }

    fn hash_of(key: &CacheKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_calling_conventions_agree() {
        let sig = Signature::new("f").param("a").param_default("b", 2);

        let k1 = build_key(&sig, &CallArgs::new().kwarg("a", 1).kwarg("b", 2)).unwrap();
        let k2 = build_key(&sig, &CallArgs::new().arg(1).arg(2)).unwrap();
        let k3 = build_key(&sig, &CallArgs::new().kwarg("b", 2).kwarg("a", 1)).unwrap();
        let k4 = build_key(&sig, &CallArgs::new().arg(1)).unwrap();

        assert_eq!(k1, k2);
        assert_eq!(k2, k3);
        assert_eq!(k3, k4);
        assert_eq!(hash_of(&k1), hash_of(&k4));
        assert_eq!(k1.digest(), k4.digest());
    }

    #[test]
    fn test_defaults_filled() {
        let key = build_key(&add_sig(), &CallArgs::new().arg(5)).unwrap();

        assert_eq!(key.get("a"), Some(&NormalizedValue::Int(5)));
        assert_eq!(key.get("b"), Some(&NormalizedValue::Int(10)));
        assert_eq!(key.to_string(), "math::add(a=5, b=10)");
    }

    #[test]
    fn test_keyword_then_positional_fill() {
        // keywords claim their slots first, positionals take what is left
        let sig = Signature::new("f").param("a").param("b").param("c");
        let key = build_key(&sig, &CallArgs::new().kwarg("a", 1).arg(2).arg(3)).unwrap();

        assert_eq!(key.get("a"), Some(&NormalizedValue::Int(1)));
        assert_eq!(key.get("b"), Some(&NormalizedValue::Int(2)));
        assert_eq!(key.get("c"), Some(&NormalizedValue::Int(3)));
    }

    #[test]
    fn test_different_values_differ() {
        let k1 = build_key(&add_sig(), &CallArgs::new().arg(5)).unwrap();
        let k2 = build_key(&add_sig(), &CallArgs::new().arg(5).arg(11)).unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_same_binding_different_callable() {
        let f = Signature::new("f").param("x");
        let g = Signature::new("g").param("x");
        let args = CallArgs::new().arg(1);

        assert_ne!(build_key(&f, &args).unwrap(), build_key(&g, &args).unwrap());
    }

    #[test]
    fn test_unknown_keyword() {
        let err = build_key(&add_sig(), &CallArgs::new().arg(1).kwarg("c", 3)).unwrap_err();
        assert!(matches!(err, Error::ArgumentBinding { .. }));
        assert!(err.to_string().contains("'c'"));
    }

    #[test]
    fn test_duplicate_keyword() {
        let args = CallArgs::new().kwarg("a", 1).kwarg("a", 2);
        assert!(matches!(
            build_key(&add_sig(), &args),
            Err(Error::ArgumentBinding { .. })
        ));
    }

    #[test]
    fn test_too_many_positional() {
        let args = CallArgs::new().arg(1).arg(2).arg(3);
        assert!(matches!(
            build_key(&add_sig(), &args),
            Err(Error::ArgumentBinding { .. })
        ));
    }

    #[test]
    fn test_missing_required() {
        let err = build_key(&add_sig(), &CallArgs::new().kwarg("b", 1)).unwrap_err();
        assert!(err.to_string().contains("missing required argument 'a'"));
    }

    #[test]
    fn test_not_hashable_names_parameter() {
        let args = CallArgs::new().arg(1).kwarg("b", f64::NAN);
        match build_key(&add_sig(), &args) {
            Err(Error::NotHashable { param, .. }) => assert_eq!(param, "b"),
            other => panic!("expected NotHashable, got {:?}", other),
        }
    }

    #[test]
    fn test_tracked_argument_nests_key() {
        let inner = build_key(&add_sig(), &CallArgs::new().arg(5)).unwrap();
        let sig = Signature::new("math::double").param("x");
        let key = build_key(&sig, &CallArgs::new().arg(ArgValue::Tracked(inner.clone()))).unwrap();

        assert_eq!(key.get("x"), Some(&NormalizedValue::Key(Box::new(inner))));
        assert_eq!(key.to_string(), "math::double(x=math::add(a=5, b=10))");
    }

    #[test]
    fn test_key_serde_roundtrip_preserves_digest() {
        let key = build_key(
            &Signature::new("f").param("xs").param("opts"),
            &CallArgs::new()
                .arg(vec![1.5, -2.0])
                .kwarg("opts", serde_json::json!({"deep": {"n": 1}})),
        )
        .unwrap();

        let json = serde_json::to_string(&key).unwrap();
        let back: CacheKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert_eq!(back.digest(), key.digest());
    }
}
