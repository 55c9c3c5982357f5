//! Handler acceptance declarations and their normalization.

use std::fmt;

use super::infer::infer_type_args;
use super::{TypeArg, TypeKey};
use crate::effect::{AnyEffect, Effect, EffectClass};
use crate::error::ConfigurationError;

/// What a handler declares it accepts, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum Accept {
    /// Every instance of the class or its subclasses.
    Class(&'static EffectClass),
    /// Instances of the class whose type arguments match.
    Applied(&'static EffectClass, Vec<TypeArg>),
    /// Any of several declarations.
    Union(Vec<Accept>),
    /// A type that is not an effect class. Always rejected by [`normalize`].
    Foreign(TypeKey),
}

impl Accept {
    /// The specialization a typed handler for `E` accepts.
    pub fn of<E: Effect>() -> Self {
        let params = E::type_params();
        if params.is_empty() {
            Accept::Class(E::class())
        } else {
            Accept::Applied(E::class(), params)
        }
    }

    /// Every effect whatsoever.
    pub fn any() -> Self {
        Accept::Class(EffectClass::root())
    }

    /// A class with explicit type arguments.
    pub fn applied(class: &'static EffectClass, args: Vec<TypeArg>) -> Self {
        Accept::Applied(class, args)
    }

    /// A non-effect Rust type.
    pub fn foreign<T: ?Sized + 'static>() -> Self {
        Accept::Foreign(TypeKey::of::<T>())
    }

    /// `self | other`.
    pub fn or(self, other: impl Into<Accept>) -> Self {
        let other = other.into();
        match self {
            Accept::Union(mut members) => {
                members.push(other);
                Accept::Union(members)
            }
            single => Accept::Union(vec![single, other]),
        }
    }
}

impl From<&'static EffectClass> for Accept {
    fn from(class: &'static EffectClass) -> Self {
        Accept::Class(class)
    }
}

/// One normalized acceptance: a class plus optional type arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptSpec {
    class: &'static EffectClass,
    args: Vec<TypeArg>,
}

impl AcceptSpec {
    /// Accept every instance of `class`.
    pub fn class(class: &'static EffectClass) -> Self {
        AcceptSpec {
            class,
            args: Vec::new(),
        }
    }

    /// The specialization a typed handler for `E` accepts.
    pub fn of<E: Effect>() -> Self {
        AcceptSpec {
            class: E::class(),
            args: E::type_params(),
        }
    }

    /// The accepted class.
    pub fn effect_class(&self) -> &'static EffectClass {
        self.class
    }

    /// The declared type arguments; empty for a plain class.
    pub fn args(&self) -> &[TypeArg] {
        &self.args
    }

    /// Whether `effect` is accepted.
    ///
    /// The effect's class must be the accepted class or a subclass. Declared
    /// type arguments must each match the inferred argument at that position.
    /// When inference cannot bind the arguments, the effect is accepted only
    /// if the class has no parameter-typed fields that could tell
    /// specializations apart.
    pub fn matches(&self, effect: &dyn AnyEffect) -> bool {
        if !effect.effect_class().is_subclass_of(self.class) {
            return false;
        }
        if self.args.is_empty() {
            return true;
        }

        match infer_type_args(effect, self.class, self.args.len()) {
            Some(inferred) => self
                .args
                .iter()
                .zip(&inferred)
                .all(|(expected, actual)| expected.matches(actual)),
            None => !self.class.has_param_fields(),
        }
    }
}

impl fmt::Display for AcceptSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(self.class.name());
        }
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}[{}]", self.class.name(), args.join(", "))
    }
}

/// Flatten an acceptance declaration into concrete specs.
///
/// Fails when a member is not an effect class, when a class is given more
/// type arguments than it declares, or when nothing is accepted at all.
pub fn normalize(accept: &Accept) -> Result<Vec<AcceptSpec>, ConfigurationError> {
    let mut specs = Vec::new();
    flatten(accept, &mut specs)?;
    if specs.is_empty() {
        return Err(ConfigurationError::EmptyAcceptance);
    }
    Ok(specs)
}

fn flatten(accept: &Accept, specs: &mut Vec<AcceptSpec>) -> Result<(), ConfigurationError> {
    match accept {
        Accept::Class(class) => specs.push(AcceptSpec::class(class)),
        Accept::Applied(class, args) => {
            let declared = class.params().len();
            if args.len() > declared {
                return Err(ConfigurationError::TooManyTypeArguments {
                    class: class.name(),
                    declared,
                    given: args.len(),
                });
            }
            specs.push(AcceptSpec {
                class,
                args: args.clone(),
            });
        }
        Accept::Union(members) => {
            for member in members {
                flatten(member, specs)?;
            }
        }
        Accept::Foreign(key) => {
            return Err(ConfigurationError::NotAnEffect { found: key.name() });
        }
    }
    Ok(())
}
