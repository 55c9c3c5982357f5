//! Runtime shapes of field values.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::TypeKey;
use crate::effect::AnyEffect;

/// What inference sees of a field value: its type and, for containers, a
/// representative element.
#[derive(Clone, Debug, PartialEq)]
pub struct Observed {
    ty: TypeKey,
    shape: Shape,
}

/// Structure of an observed value.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// No inner structure.
    Leaf,
    /// Ordered container; the first element, if any.
    Seq(Option<Box<Observed>>),
    /// Unordered container; one element, if any.
    Set(Option<Box<Observed>>),
    /// Tuple elements, in order.
    Tuple(Vec<Observed>),
    /// Mapping; one entry, if any.
    Map(Option<Box<(Observed, Observed)>>),
    /// A reference, `Box`, `Arc` or `Option` around the value; `None` when an
    /// `Option` is empty.
    Wrapped(Option<Box<Observed>>),
    /// Callable with a declared signature.
    Callable {
        /// Parameter types.
        params: Vec<TypeKey>,
        /// Return type.
        ret: TypeKey,
    },
}

impl Observed {
    /// A value with no inner structure.
    pub fn leaf(ty: TypeKey) -> Self {
        Observed {
            ty,
            shape: Shape::Leaf,
        }
    }

    /// A value with the given structure.
    pub fn new(ty: TypeKey, shape: Shape) -> Self {
        Observed { ty, shape }
    }

    /// Observe any reflectable value.
    pub fn of<T: Reflect + ?Sized>(value: &T) -> Self {
        T::reflect(value)
    }

    /// Observe a field that holds an effect; its type is the effect's class.
    pub fn effect(effect: &dyn AnyEffect) -> Self {
        Observed::leaf(TypeKey::effect(effect.effect_class()))
    }

    /// Runtime type of the value.
    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    /// Structure of the value.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// Types whose values can be observed by inference.
pub trait Reflect {
    /// Observe this value.
    fn reflect(&self) -> Observed;
}

macro_rules! impl_reflect_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn reflect(&self) -> Observed {
                    Observed::leaf(TypeKey::of::<$ty>())
                }
            }
        )*
    };
}

impl_reflect_leaf!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    str,
    String,
);

impl<T: Reflect + ?Sized + 'static> Reflect for &T {
    fn reflect(&self) -> Observed {
        wrapped::<&'static T>(Some(T::reflect(self)))
    }
}

impl<T: Reflect + ?Sized + 'static> Reflect for Box<T> {
    fn reflect(&self) -> Observed {
        wrapped::<Box<T>>(Some(T::reflect(self)))
    }
}

impl<T: Reflect + ?Sized + 'static> Reflect for Arc<T> {
    fn reflect(&self) -> Observed {
        wrapped::<Arc<T>>(Some(T::reflect(self)))
    }
}

impl<T: Reflect + 'static> Reflect for Option<T> {
    fn reflect(&self) -> Observed {
        wrapped::<Option<T>>(self.as_ref().map(T::reflect))
    }
}

fn wrapped<W: ?Sized + 'static>(inner: Option<Observed>) -> Observed {
    Observed::new(TypeKey::of::<W>(), Shape::Wrapped(inner.map(Box::new)))
}

fn first<'a, T: Reflect + 'a>(mut items: impl Iterator<Item = &'a T>) -> Option<Box<Observed>> {
    items.next().map(|item| Box::new(T::reflect(item)))
}

impl<T: Reflect + 'static> Reflect for Vec<T> {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<Vec<T>>(), Shape::Seq(first(self.iter())))
    }
}

impl<T: Reflect + 'static> Reflect for [T] {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<[T]>(), Shape::Seq(first(self.iter())))
    }
}

impl<T: Reflect + 'static, const N: usize> Reflect for [T; N] {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<[T; N]>(), Shape::Seq(first(self.iter())))
    }
}

impl<T: Reflect + 'static> Reflect for VecDeque<T> {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<VecDeque<T>>(), Shape::Seq(first(self.iter())))
    }
}

impl<T: Reflect + 'static, S: 'static> Reflect for HashSet<T, S> {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<HashSet<T, S>>(), Shape::Set(first(self.iter())))
    }
}

impl<T: Reflect + 'static> Reflect for BTreeSet<T> {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<BTreeSet<T>>(), Shape::Set(first(self.iter())))
    }
}

fn first_entry<'a, K, V>(mut entries: impl Iterator<Item = (&'a K, &'a V)>) -> Shape
where
    K: Reflect + 'a,
    V: Reflect + 'a,
{
    Shape::Map(
        entries
            .next()
            .map(|(key, value)| Box::new((K::reflect(key), V::reflect(value)))),
    )
}

impl<K: Reflect + 'static, V: Reflect + 'static, S: 'static> Reflect for HashMap<K, V, S> {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<HashMap<K, V, S>>(), first_entry(self.iter()))
    }
}

impl<K: Reflect + 'static, V: Reflect + 'static> Reflect for BTreeMap<K, V> {
    fn reflect(&self) -> Observed {
        Observed::new(TypeKey::of::<BTreeMap<K, V>>(), first_entry(self.iter()))
    }
}

macro_rules! impl_reflect_tuple {
    ($(($($name:ident : $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: Reflect + 'static),+> Reflect for ($($name,)+) {
                fn reflect(&self) -> Observed {
                    Observed::new(
                        TypeKey::of::<($($name,)+)>(),
                        Shape::Tuple(vec![$(self.$idx.reflect()),+]),
                    )
                }
            }
        )*
    };
}

impl_reflect_tuple!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
);

/// Parameter lists a [`Func`] can declare.
pub trait Signature {
    /// Parameter types, in order.
    fn param_keys() -> Vec<TypeKey>;
}

macro_rules! impl_signature {
    ($(($($name:ident),*)),* $(,)?) => {
        $(
            impl<$($name: 'static),*> Signature for ($($name,)*) {
                fn param_keys() -> Vec<TypeKey> {
                    vec![$(TypeKey::of::<$name>()),*]
                }
            }
        )*
    };
}

impl_signature!((), (A), (A, B), (A, B, C), (A, B, C, D));

/// A callable field value with a declared signature.
///
/// Closures carry no runtime signature; wrapping one in `Func` records its
/// parameter and return types so inference can bind type parameters from them.
///
/// ```rust
/// use eddy::types::{Func, Reflect, Shape, TypeKey};
///
/// let parse = Func::new(|(s,): (String,)| s.len());
/// assert_eq!(parse.call(("abc".to_string(),)), 3);
///
/// match parse.reflect().shape() {
///     Shape::Callable { params, ret } => {
///         assert_eq!(params, &vec![TypeKey::of::<String>()]);
///         assert_eq!(ret, &TypeKey::of::<usize>());
///     }
///     _ => unreachable!(),
/// }
/// ```
pub struct Func<Args, R> {
    f: Arc<dyn Fn(Args) -> R + Send + Sync>,
}

impl<Args, R> Func<Args, R> {
    /// Wrap a closure taking its arguments as a tuple.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Args) -> R + Send + Sync + 'static,
    {
        Func { f: Arc::new(f) }
    }

    /// Call the wrapped closure.
    pub fn call(&self, args: Args) -> R {
        (self.f)(args)
    }
}

impl<Args, R> Clone for Func<Args, R> {
    fn clone(&self) -> Self {
        Func { f: self.f.clone() }
    }
}

impl<Args, R> fmt::Debug for Func<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Func({} -> {})",
            super::short_name(std::any::type_name::<Args>()),
            super::short_name(std::any::type_name::<R>())
        )
    }
}

impl<Args: Signature + 'static, R: 'static> Reflect for Func<Args, R> {
    fn reflect(&self) -> Observed {
        Observed::new(
            TypeKey::of::<Func<Args, R>>(),
            Shape::Callable {
                params: Args::param_keys(),
                ret: TypeKey::of::<R>(),
            },
        )
    }
}
