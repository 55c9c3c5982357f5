//! Type-argument inference and effect descriptions.

use std::collections::HashMap;

use super::reflect::{Observed, Shape};
use super::{FieldType, TypeKey};
use crate::effect::{AnyEffect, EffectClass};

/// Type parameter name to the first concrete type observed for it.
pub type Bindings = HashMap<&'static str, TypeKey>;

/// Infer the first `expected` type arguments of `effect` as an instance of
/// `class`.
///
/// The instance's cached arguments win when their count is `expected`;
/// otherwise the arguments are inferred from field values. Returns `None` when
/// any parameter stays unbound.
pub fn infer_type_args(
    effect: &dyn AnyEffect,
    class: &EffectClass,
    expected: usize,
) -> Option<Vec<TypeKey>> {
    if expected == 0 {
        return Some(Vec::new());
    }

    if let Some(cached) = effect.cached_type_args() {
        if cached.len() == expected {
            return Some(cached);
        }
    }

    infer_from_fields(effect, class, expected)
}

/// Infer type arguments purely from field values.
pub fn infer_from_fields(
    effect: &dyn AnyEffect,
    class: &EffectClass,
    expected: usize,
) -> Option<Vec<TypeKey>> {
    let params = class.params();
    if params.is_empty() {
        return None;
    }

    let values: HashMap<&'static str, Observed> = effect.field_values().into_iter().collect();
    let mut bindings = Bindings::new();
    for (name, annotation) in class.fields() {
        if let Some(value) = values.get(name) {
            collect_bindings(&annotation, value, &mut bindings);
        }
    }

    params
        .iter()
        .take(expected)
        .map(|param| bindings.get(param).copied())
        .collect()
}

/// Unify `annotation` with an observed value, recording parameter bindings.
///
/// A parameter keeps the first type bound to it; later observations for the
/// same parameter are ignored rather than reconciled. Containers contribute
/// their representative element; empty containers bind nothing.
///
/// A bare parameter binds a wrapped value's own type (`Option<i32>`); every
/// other annotation looks through the wrapper, and an empty `Option` is seen
/// as `()`.
pub fn collect_bindings(annotation: &FieldType, value: &Observed, bindings: &mut Bindings) {
    match (annotation, value.shape()) {
        (FieldType::Param(_), _) => {}
        (_, Shape::Wrapped(Some(inner))) => return collect_bindings(annotation, inner, bindings),
        (_, Shape::Wrapped(None)) => {
            return collect_bindings(annotation, &Observed::leaf(TypeKey::of::<()>()), bindings)
        }
        _ => {}
    }

    match annotation {
        FieldType::Param(name) => {
            bindings.entry(*name).or_insert(value.ty());
        }
        FieldType::Union(options) => {
            for option in options {
                collect_bindings(option, value, bindings);
            }
        }
        FieldType::Concrete(_) | FieldType::Opaque => {}
        FieldType::Tuple(items) => {
            if let Shape::Tuple(values) = value.shape() {
                if items.len() == values.len() {
                    for (item, observed) in items.iter().zip(values) {
                        collect_bindings(item, observed, bindings);
                    }
                }
            }
        }
        FieldType::VarTuple(item) => {
            if let Shape::Tuple(values) = value.shape() {
                for observed in values {
                    collect_bindings(item, observed, bindings);
                }
            }
        }
        FieldType::List(item) => {
            if let Shape::Seq(Some(first)) = value.shape() {
                collect_bindings(item, first, bindings);
            }
        }
        FieldType::Set(item) => {
            if let Shape::Set(Some(first)) = value.shape() {
                collect_bindings(item, first, bindings);
            }
        }
        FieldType::Map(key, mapped) => {
            if let Shape::Map(Some(entry)) = value.shape() {
                collect_bindings(key, &entry.0, bindings);
                collect_bindings(mapped, &entry.1, bindings);
            }
        }
        FieldType::Callable(params, ret) => {
            if let Shape::Callable {
                params: observed,
                ret: observed_ret,
            } = value.shape()
            {
                if params.len() == observed.len() {
                    for (param, key) in params.iter().zip(observed) {
                        collect_bindings(param, &Observed::leaf(*key), bindings);
                    }
                }
                collect_bindings(ret, &Observed::leaf(*observed_ret), bindings);
            }
        }
    }
}

/// Render an effect with its type arguments, e.g. `Box[i32]`.
///
/// Falls back to the `Debug` rendering when the class has no type parameters
/// or they cannot be inferred.
pub fn describe(effect: &dyn AnyEffect) -> String {
    let class = effect.effect_class();

    if let Some(cached) = effect.cached_type_args() {
        if !cached.is_empty() {
            return format_applied(class.name(), &cached);
        }
    }

    let params = class.params();
    if !params.is_empty() {
        if let Some(inferred) = infer_type_args(effect, class, params.len()) {
            if !inferred.is_empty() {
                return format_applied(class.name(), &inferred);
            }
        }
    }

    format!("{:?}", effect)
}

fn format_applied(name: &str, args: &[TypeKey]) -> String {
    let args: Vec<String> = args.iter().map(TypeKey::name).collect();
    format!("{}[{}]", name, args.join(", "))
}
