//! Declared parameter lists and actual call arguments

use super::ArgValue;
use crate::{Error, Result};

/// One declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<ArgValue>,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<ArgValue>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// Declared signature of a memoized callable
///
/// The name is the callable's fully-qualified name; it selects the storage
/// the callable's results live in.
///
/// ```rust,ignore
/// let sig = Signature::new("math::add").param("a").param_default("b", 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Add a required parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::required(name));
        self
    }

    /// Add a parameter with a default value
    pub fn param_default(mut self, name: impl Into<String>, default: impl Into<ArgValue>) -> Self {
        self.params.push(Param::with_default(name, default));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Reject parameter lists that no call could bind unambiguously
    pub fn validate(&self) -> Result<()> {
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(Error::binding(
                    &self.name,
                    format!("parameter '{}' declared twice", param.name),
                ));
            }
        }
        Ok(())
    }
}

/// Actual arguments of one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<ArgValue>,
    pub keyword: Vec<(String, ArgValue)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_builder() {
        let sig = Signature::new("math::add").param("a").param_default("b", 10);

        assert_eq!(sig.name(), "math::add");
        assert_eq!(sig.params().len(), 2);
        assert_eq!(sig.position("b"), Some(1));
        assert_eq!(sig.params()[1].default, Some(ArgValue::Int(10)));
        assert!(sig.validate().is_ok());
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let sig = Signature::new("f").param("x").param_default("x", 1);
        assert!(matches!(sig.validate(), Err(Error::ArgumentBinding { .. })));
    }

    #[test]
    fn test_call_args_builder() {
        let args = CallArgs::new().arg(5).kwarg("b", "x");

        assert_eq!(args.positional, vec![ArgValue::Int(5)]);
        assert_eq!(args.keyword, vec![("b".to_string(), ArgValue::Str("x".into()))]);
        assert!(!args.is_empty());
        assert!(CallArgs::new().is_empty());
    }
}
