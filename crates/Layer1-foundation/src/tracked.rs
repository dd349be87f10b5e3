//! Results that remember which call produced them
//!
//! Every value returned by a memoized call comes back as a [`Tracked`]. When
//! it is passed on to another memoized call (as `&tracked`), key
//! construction substitutes the origin key instead of normalizing the value
//! itself. Pipelines like `g(f(x))` therefore get keys of the form
//! `g(x=f(x=..))` without hashing `f`'s output.
//!
//! Passing the plain inner value instead still works; the value is then
//! normalized like any other argument. A value derived from a tracked
//! result is no longer the call's output, so there is no way to build a
//! `Tracked` from it other than running another memoized call.

use std::ops::Deref;

use crate::key::{ArgValue, CacheKey, NormalizedValue};

/// A value paired with the key of the call that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    value: T,
    origin: CacheKey,
}

impl<T> Tracked<T> {
    pub fn new(value: T, origin: CacheKey) -> Self {
        Self { value, origin }
    }

    /// Key of the call that produced this value
    pub fn origin(&self) -> &CacheKey {
        &self.origin
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, CacheKey) {
        (self.value, self.origin)
    }

    pub fn as_ref(&self) -> Tracked<&T> {
        Tracked {
            value: &self.value,
            origin: self.origin.clone(),
        }
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> From<&Tracked<T>> for ArgValue {
    fn from(tracked: &Tracked<T>) -> Self {
        ArgValue::Tracked(tracked.origin.clone())
    }
}

impl<T> From<Tracked<T>> for ArgValue {
    fn from(tracked: Tracked<T>) -> Self {
        ArgValue::Tracked(tracked.origin)
    }
}

/// Split a tracked tuple into individually tracked elements
///
/// Element `i` is tracked against [`element_origin`]`(origin, i)`, so two
/// elements of one result never key alike downstream.
pub trait Split {
    type Parts;

    fn split(self) -> Self::Parts;
}

/// Origin of element `index` of the result produced by `parent`
///
/// Rendered as `<callable>[<index>](of=<parent>, index=<index>)`.
pub fn element_origin(parent: &CacheKey, index: usize) -> CacheKey {
    CacheKey::from_entries(
        format!("{}[{}]", parent.callable(), index),
        vec![
            ("of".to_string(), NormalizedValue::Key(Box::new(parent.clone()))),
            ("index".to_string(), NormalizedValue::Int(index as i64)),
        ],
    )
}

macro_rules! impl_split {
    ($($idx:tt $name:ident),+) => {
        impl<$($name),+> Split for Tracked<($($name,)+)> {
            type Parts = ($(Tracked<$name>,)+);

            #[allow(non_snake_case)]
            fn split(self) -> Self::Parts {
                let ($($name,)+) = self.value;
                ($(Tracked::new($name, element_origin(&self.origin, $idx)),)+)
            }
        }
    };
}

impl_split!(0 A, 1 B);
impl_split!(0 A, 1 B, 2 C);
impl_split!(0 A, 1 B, 2 C, 3 D);
