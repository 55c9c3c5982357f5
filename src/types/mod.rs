//! Type matching for parameterized effects.
//!
//! Several handlers can be registered for one effect class and differ only by
//! the type arguments they accept, such as `Box[i32]` and `Box[String]`. This
//! module provides the pieces the dispatcher uses to pick between them:
//!
//! - [`TypeKey`] - a concrete runtime type (a Rust type or an effect class)
//! - [`TypeArg`] - a declared type argument (`Any`, a placeholder, a type, a union)
//! - [`FieldType`] - a field annotation on an effect class
//! - [`Observed`] / [`Reflect`] - the runtime shape of a field value
//! - [`Accept`] / [`AcceptSpec`] - what a handler declares it accepts
//! - [`infer_type_args`] / [`describe`] - inference and diagnostics
//!
//! # Example
//!
//! ```rust
//! use eddy::types::{infer_type_args, FieldType, Observed, Reflect, TypeKey};
//! use eddy::{Effect, EffectClass};
//!
//! #[derive(Debug)]
//! struct Boxed<T>(T);
//!
//! fn box_fields() -> Vec<(&'static str, FieldType)> {
//!     vec![("value", FieldType::param("T"))]
//! }
//!
//! static BOX: EffectClass = EffectClass::new("Box")
//!     .with_params(&["T"])
//!     .with_fields(box_fields);
//!
//! impl<T: Reflect + std::fmt::Debug + Send + Sync + 'static> Effect for Boxed<T> {
//!     type Output = String;
//!
//!     fn class() -> &'static EffectClass {
//!         &BOX
//!     }
//!
//!     fn fields(&self) -> Vec<(&'static str, Observed)> {
//!         vec![("value", self.0.reflect())]
//!     }
//! }
//!
//! let inferred = infer_type_args(&Boxed(5_i32), &BOX, 1);
//! assert_eq!(inferred, Some(vec![TypeKey::of::<i32>()]));
//! ```

mod accept;
mod infer;
mod reflect;

#[cfg(test)]
mod tests;

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::effect::EffectClass;

pub use accept::{normalize, Accept, AcceptSpec};
pub use infer::{collect_bindings, describe, infer_from_fields, infer_type_args, Bindings};
pub use reflect::{Func, Observed, Reflect, Shape, Signature};

/// A concrete runtime type.
#[derive(Clone, Copy)]
pub enum TypeKey {
    /// A Rust type.
    Native {
        /// Identity of the type.
        id: TypeId,
        /// Full `std::any::type_name` of the type.
        name: &'static str,
    },
    /// An effect class, for fields that hold effects.
    Effect(&'static EffectClass),
}

impl TypeKey {
    /// Key of the Rust type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey::Native {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Key of an effect class.
    pub fn effect(class: &'static EffectClass) -> Self {
        TypeKey::Effect(class)
    }

    /// Short display name with module paths stripped (`Vec<String>`).
    pub fn name(&self) -> String {
        match self {
            TypeKey::Native { name, .. } => short_name(name),
            TypeKey::Effect(class) => class.name().to_string(),
        }
    }

    /// True when `self` equals `other` or, for effect classes, derives from it.
    pub fn is_subtype_of(&self, other: &TypeKey) -> bool {
        match (self, other) {
            (TypeKey::Native { id: a, .. }, TypeKey::Native { id: b, .. }) => a == b,
            (TypeKey::Effect(a), TypeKey::Effect(b)) => a.is_subclass_of(b),
            _ => false,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeKey::Native { id: a, .. }, TypeKey::Native { id: b, .. }) => a == b,
            (TypeKey::Effect(a), TypeKey::Effect(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TypeKey::Native { id, .. } => id.hash(state),
            TypeKey::Effect(class) => std::ptr::hash(*class, state),
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A declared type argument of an accepted specialization.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeArg {
    /// Wildcard: matches every inferred type.
    Any,
    /// A type-parameter placeholder: matches every inferred type.
    Param(&'static str),
    /// Matches the type itself and its subtypes.
    Exact(TypeKey),
    /// Matches when any member matches.
    Union(Vec<TypeArg>),
}

impl TypeArg {
    /// `Exact` for the Rust type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeArg::Exact(TypeKey::of::<T>())
    }

    /// `Exact` for an effect class.
    pub fn effect(class: &'static EffectClass) -> Self {
        TypeArg::Exact(TypeKey::effect(class))
    }

    /// Whether an inferred argument satisfies this declaration.
    pub fn matches(&self, actual: &TypeKey) -> bool {
        match self {
            TypeArg::Any | TypeArg::Param(_) => true,
            TypeArg::Union(options) => options.iter().any(|option| option.matches(actual)),
            TypeArg::Exact(expected) => actual.is_subtype_of(expected),
        }
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Any => f.write_str("Any"),
            TypeArg::Param(name) => f.write_str(name),
            TypeArg::Exact(key) => f.write_str(&key.name()),
            TypeArg::Union(options) => {
                let names: Vec<String> = options.iter().map(ToString::to_string).collect();
                f.write_str(&names.join(" | "))
            }
        }
    }
}

/// The declared type of an effect field, as seen by inference.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    /// The field's type is a type parameter.
    Param(&'static str),
    /// A fixed type; binds nothing.
    Concrete(TypeKey),
    /// Anything inference should not look into.
    Opaque,
    /// One of several annotations.
    Union(Vec<FieldType>),
    /// Ordered homogeneous container.
    List(Box<FieldType>),
    /// Unordered homogeneous container.
    Set(Box<FieldType>),
    /// Fixed-arity tuple.
    Tuple(Vec<FieldType>),
    /// Variable-arity homogeneous tuple.
    VarTuple(Box<FieldType>),
    /// Mapping from keys to values.
    Map(Box<FieldType>, Box<FieldType>),
    /// Callable with parameter and return annotations.
    Callable(Vec<FieldType>, Box<FieldType>),
}

impl FieldType {
    /// A type-parameter field.
    pub fn param(name: &'static str) -> Self {
        FieldType::Param(name)
    }

    /// A field of the fixed Rust type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        FieldType::Concrete(TypeKey::of::<T>())
    }

    /// `List[inner]`.
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    /// `Set[inner]`.
    pub fn set(inner: FieldType) -> Self {
        FieldType::Set(Box::new(inner))
    }

    /// `Tuple[a, b, ...]`.
    pub fn tuple(items: Vec<FieldType>) -> Self {
        FieldType::Tuple(items)
    }

    /// `Tuple[inner, ...]`.
    pub fn var_tuple(inner: FieldType) -> Self {
        FieldType::VarTuple(Box::new(inner))
    }

    /// `Map[key, value]`.
    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map(Box::new(key), Box::new(value))
    }

    /// `Callable[[params], ret]`.
    pub fn callable(params: Vec<FieldType>, ret: FieldType) -> Self {
        FieldType::Callable(params, Box::new(ret))
    }

    /// `a | b | ...`.
    pub fn union(options: Vec<FieldType>) -> Self {
        FieldType::Union(options)
    }

    /// True when a type parameter appears anywhere in this annotation.
    pub fn contains_param(&self) -> bool {
        match self {
            FieldType::Param(_) => true,
            FieldType::Concrete(_) | FieldType::Opaque => false,
            FieldType::Union(items) | FieldType::Tuple(items) => {
                items.iter().any(FieldType::contains_param)
            }
            FieldType::List(inner) | FieldType::Set(inner) | FieldType::VarTuple(inner) => {
                inner.contains_param()
            }
            FieldType::Map(key, value) => key.contains_param() || value.contains_param(),
            FieldType::Callable(params, ret) => {
                params.iter().any(FieldType::contains_param) || ret.contains_param()
            }
        }
    }
}

/// Strip module paths from a `type_name`, keeping generic structure.
pub(crate) fn short_name(full: &str) -> String {
    fn last_segment(path: &str) -> &str {
        path.rsplit("::").next().unwrap_or(path)
    }

    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            out.push_str(last_segment(&segment));
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(last_segment(&segment));
    out
}
