//! Effect values and effect classes.
//!
//! An effect is a plain Rust value describing a request. Sending it hands the
//! value to the closest handler that accepts its class; the handler's answer
//! becomes the result of [`send`](crate::send).
//!
//! Every effect type points at a `static` [`EffectClass`]. The class carries
//! what Rust erases at runtime: the family name shared by every instantiation
//! of a generic effect, the declared type parameters, the field annotations
//! used for type-argument inference, and an optional parent class.
//!
//! # Example
//!
//! ```rust
//! use eddy::{Effect, EffectClass};
//!
//! #[derive(Debug)]
//! struct Ask(String);
//!
//! static ASK: EffectClass = EffectClass::new("Ask");
//!
//! impl Effect for Ask {
//!     type Output = String;
//!
//!     fn class() -> &'static EffectClass {
//!         &ASK
//!     }
//! }
//!
//! assert_eq!(Ask::class().name(), "Ask");
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::dispatch::{self, Resolution};
use crate::error::Result;
use crate::types::{FieldType, Observed, TypeArg, TypeKey};

/// A typed request that handlers can answer.
///
/// Only [`Output`](Effect::Output) and [`class`](Effect::class) are required.
/// The remaining methods feed the type matcher and default to "nothing to
/// say":
///
/// - [`type_params`](Effect::type_params) declares which specialization a
///   typed handler for this Rust type accepts (e.g. `Box[i32]`).
/// - [`type_args`](Effect::type_args) is the construction-time cache of the
///   concrete type arguments of an instance. When present it is authoritative.
/// - [`fields`](Effect::fields) exposes field values so type arguments can be
///   inferred from them when no cache exists.
/// - [`base`](Effect::base) exposes the parent part of an effect whose class
///   extends another class.
pub trait Effect: fmt::Debug + Send + Sync + 'static {
    /// The type of the answer a handler returns for this request.
    type Output: Send + 'static;

    /// The class shared by every value of this type.
    fn class() -> &'static EffectClass
    where
        Self: Sized;

    /// Type arguments a typed handler for this Rust type is specialized to.
    fn type_params() -> Vec<TypeArg>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Concrete type arguments cached on this instance, if any.
    fn type_args(&self) -> Option<Vec<TypeKey>> {
        None
    }

    /// Field values, by field name, for type-argument inference.
    fn fields(&self) -> Vec<(&'static str, Observed)> {
        Vec::new()
    }

    /// The parent effect embedded in this one, for subclass effects.
    fn base(&self) -> Option<&dyn AnyEffect> {
        None
    }
}

/// Object-safe view of an [`Effect`], implemented for every effect type.
pub trait AnyEffect: fmt::Debug + Send + Sync + 'static {
    /// Class of the concrete effect type.
    fn effect_class(&self) -> &'static EffectClass;

    /// See [`Effect::type_args`].
    fn cached_type_args(&self) -> Option<Vec<TypeKey>>;

    /// See [`Effect::fields`].
    fn field_values(&self) -> Vec<(&'static str, Observed)>;

    /// See [`Effect::base`].
    fn base_effect(&self) -> Option<&dyn AnyEffect>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl<E: Effect> AnyEffect for E {
    fn effect_class(&self) -> &'static EffectClass {
        E::class()
    }

    fn cached_type_args(&self) -> Option<Vec<TypeKey>> {
        self.type_args()
    }

    fn field_values(&self) -> Vec<(&'static str, Observed)> {
        self.fields()
    }

    fn base_effect(&self) -> Option<&dyn AnyEffect> {
        self.base()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Find `E` in `effect` or in its chain of base effects.
pub fn downcast_effect<E: Effect>(effect: &dyn AnyEffect) -> Option<&E> {
    let mut current = Some(effect);
    while let Some(candidate) = current {
        if let Some(found) = candidate.as_any().downcast_ref::<E>() {
            return Some(found);
        }
        current = candidate.base_effect();
    }
    None
}

fn no_fields() -> Vec<(&'static str, FieldType)> {
    Vec::new()
}

static ROOT: EffectClass = EffectClass::new("Effect");

/// Runtime descriptor of an effect family.
///
/// Declare one per effect type as a `static`; identity is the address of the
/// static, so two classes with the same name are still different classes.
///
/// ```rust
/// use eddy::types::FieldType;
/// use eddy::EffectClass;
///
/// fn box_fields() -> Vec<(&'static str, FieldType)> {
///     vec![("value", FieldType::param("T"))]
/// }
///
/// static QUERY: EffectClass = EffectClass::new("Query");
/// static SPECIAL_QUERY: EffectClass = EffectClass::new("SpecialQuery").extends(&QUERY);
/// static BOX: EffectClass = EffectClass::new("Box")
///     .with_params(&["T"])
///     .with_fields(box_fields);
///
/// assert!(SPECIAL_QUERY.is_subclass_of(&QUERY));
/// assert!(!QUERY.is_subclass_of(&SPECIAL_QUERY));
/// assert!(BOX.has_param_fields());
/// ```
pub struct EffectClass {
    name: &'static str,
    params: &'static [&'static str],
    fields: fn() -> Vec<(&'static str, FieldType)>,
    parent: Option<&'static EffectClass>,
}

impl EffectClass {
    /// A class with no type parameters, fields or parent.
    pub const fn new(name: &'static str) -> Self {
        EffectClass {
            name,
            params: &[],
            fields: no_fields,
            parent: None,
        }
    }

    /// Declare the type parameters, in order.
    pub const fn with_params(self, params: &'static [&'static str]) -> Self {
        EffectClass { params, ..self }
    }

    /// Declare the field annotations used for inference.
    pub const fn with_fields(self, fields: fn() -> Vec<(&'static str, FieldType)>) -> Self {
        EffectClass { fields, ..self }
    }

    /// Make this class a subclass of `parent`.
    pub const fn extends(self, parent: &'static EffectClass) -> Self {
        EffectClass {
            parent: Some(parent),
            ..self
        }
    }

    /// The root class every effect class derives from.
    pub fn root() -> &'static EffectClass {
        &ROOT
    }

    /// Class name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type parameter names.
    pub fn params(&self) -> &'static [&'static str] {
        self.params
    }

    /// Declared field annotations.
    pub fn fields(&self) -> Vec<(&'static str, FieldType)> {
        (self.fields)()
    }

    /// Direct parent class, if declared.
    pub fn parent(&self) -> Option<&'static EffectClass> {
        self.parent
    }

    /// True when this class is `other` or derives from it.
    pub fn is_subclass_of(&self, other: &EffectClass) -> bool {
        if std::ptr::eq(other, &ROOT) {
            return true;
        }
        let mut current = Some(self);
        while let Some(class) = current {
            if std::ptr::eq(class, other) {
                return true;
            }
            current = class.parent;
        }
        false
    }

    /// True when any field annotation mentions a type parameter.
    pub fn has_param_fields(&self) -> bool {
        self.fields()
            .iter()
            .any(|(_, annotation)| annotation.contains_param())
    }
}

impl PartialEq for EffectClass {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for EffectClass {}

impl fmt::Debug for EffectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectClass")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("parent", &self.parent.map(|p| p.name))
            .finish()
    }
}

impl fmt::Display for EffectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A sent effect instance, shared and compared by identity.
///
/// `send` wraps its argument in an `EffectRef`; that same reference is what
/// handlers receive and what [`NoHandlerError`](crate::NoHandlerError) carries.
#[derive(Clone)]
pub struct EffectRef(Arc<dyn AnyEffect>);

impl EffectRef {
    /// Wrap a freshly constructed effect.
    pub fn new<E: Effect>(effect: E) -> Self {
        EffectRef(Arc::new(effect))
    }

    /// Wrap an effect that is already shared.
    pub fn from_arc<E: Effect>(effect: Arc<E>) -> Self {
        EffectRef(effect)
    }

    /// The erased effect.
    pub fn get(&self) -> &dyn AnyEffect {
        &*self.0
    }

    /// Class of the concrete effect.
    pub fn class(&self) -> &'static EffectClass {
        self.0.effect_class()
    }

    /// Find `E` in this effect or its base chain.
    pub fn downcast_ref<E: Effect>(&self) -> Option<&E> {
        downcast_effect::<E>(self.get())
    }

    /// True when both references point at the same instance.
    pub fn ptr_eq(&self, other: &EffectRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Human-readable rendering including inferred type arguments.
    pub fn describe(&self) -> String {
        crate::types::describe(self.get())
    }
}

impl fmt::Debug for EffectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// The typed view of an effect handed to a handler built with
/// [`Handler::new`](crate::Handler::new).
///
/// Dereferences to the effect. Keeps the original [`EffectRef`] so the
/// handler can forward the very same instance further up the stack.
pub struct Request<E> {
    effect: EffectRef,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Effect> Request<E> {
    pub(crate) fn new(effect: EffectRef) -> Option<Self> {
        effect.downcast_ref::<E>()?;
        Some(Request {
            effect,
            _marker: PhantomData,
        })
    }

    /// The shared instance being handled.
    pub fn effect_ref(&self) -> &EffectRef {
        &self.effect
    }

    /// Re-send this same instance to the handlers below the current one.
    pub fn forward(&self) -> Result<E::Output> {
        dispatch::dispatch_typed::<E>(&self.effect, Resolution::Forward)
    }

    /// Like [`forward`](Request::forward), but `Ok(None)` when nothing below
    /// accepts this instance.
    pub fn safe_forward(&self) -> Result<Option<E::Output>> {
        dispatch::safe_dispatch_typed::<E>(&self.effect, Resolution::Forward)
    }
}

impl<E: Effect> Deref for Request<E> {
    type Target = E;

    fn deref(&self) -> &E {
        match self.effect.downcast_ref::<E>() {
            Some(effect) => effect,
            None => unreachable!("Request is only built for effects containing the target type"),
        }
    }
}

impl<E: Effect> fmt::Debug for Request<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Request").field(&self.effect).finish()
    }
}

/// A type-erased handler answer.
pub struct Answer(Box<dyn Any + Send>);

impl Answer {
    /// Wrap an answer value.
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Answer(Box::new(value))
    }

    /// Recover the answer as `T`, or get it back untouched.
    pub fn downcast<T: 'static>(self) -> std::result::Result<T, Answer> {
        self.0.downcast::<T>().map(|value| *value).map_err(Answer)
    }

    /// True when the answer is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Answer(..)")
    }
}
