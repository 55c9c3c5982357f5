use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use super::*;
use crate::effect::{AnyEffect, Effect, EffectClass};
use crate::error::ConfigurationError;

trait Value: Reflect + Debug + Send + Sync + 'static {}
impl<T: Reflect + Debug + Send + Sync + 'static> Value for T {}

fn one_param(name: &'static str, annotation: FieldType) -> Vec<(&'static str, FieldType)> {
    vec![(name, annotation)]
}

// Box[T] with `value: T`
#[derive(Debug)]
struct Boxed<T>(T);

fn box_fields() -> Vec<(&'static str, FieldType)> {
    one_param("value", FieldType::param("T"))
}

static BOX: EffectClass = EffectClass::new("Box")
    .with_params(&["T"])
    .with_fields(box_fields);

impl<T: Value> Effect for Boxed<T> {
    type Output = String;

    fn class() -> &'static EffectClass {
        &BOX
    }

    fn type_params() -> Vec<TypeArg> {
        vec![TypeArg::of::<T>()]
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("value", self.0.reflect())]
    }
}

// Pair[A, B] with `first: A, second: B`
#[derive(Debug)]
struct Pair<A, B>(A, B);

fn pair_fields() -> Vec<(&'static str, FieldType)> {
    vec![("first", FieldType::param("A")), ("second", FieldType::param("B"))]
}

static PAIR: EffectClass = EffectClass::new("Pair")
    .with_params(&["A", "B"])
    .with_fields(pair_fields);

impl<A: Value, B: Value> Effect for Pair<A, B> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &PAIR
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("first", self.0.reflect()), ("second", self.1.reflect())]
    }
}

// Listed[T] with `items: List[T]`
#[derive(Debug)]
struct Listed<T>(Vec<T>);

fn listed_fields() -> Vec<(&'static str, FieldType)> {
    one_param("items", FieldType::list(FieldType::param("T")))
}

static LISTED: EffectClass = EffectClass::new("Listed")
    .with_params(&["T"])
    .with_fields(listed_fields);

impl<T: Value> Effect for Listed<T> {
    type Output = usize;

    fn class() -> &'static EffectClass {
        &LISTED
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("items", self.0.reflect())]
    }
}

// Entry[K, V] with `pair: Tuple[K, V]`
#[derive(Debug)]
struct Keyed<K, V>((K, V));

fn keyed_fields() -> Vec<(&'static str, FieldType)> {
    one_param(
        "pair",
        FieldType::tuple(vec![FieldType::param("K"), FieldType::param("V")]),
    )
}

static KEYED: EffectClass = EffectClass::new("Entry")
    .with_params(&["K", "V"])
    .with_fields(keyed_fields);

impl<K: Value, V: Value> Effect for Keyed<K, V> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &KEYED
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("pair", self.0.reflect())]
    }
}

// Spread[T] with `items: Tuple[T, ...]`
#[derive(Debug)]
struct Spread<A, B>((A, B));

fn spread_fields() -> Vec<(&'static str, FieldType)> {
    one_param("items", FieldType::var_tuple(FieldType::param("T")))
}

static SPREAD: EffectClass = EffectClass::new("Spread")
    .with_params(&["T"])
    .with_fields(spread_fields);

impl<A: Value, B: Value> Effect for Spread<A, B> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &SPREAD
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("items", self.0.reflect())]
    }
}

// Table[K, V] with `rows: Map[K, V]`
#[derive(Debug)]
struct Table<K, V>(HashMap<K, V>);

fn table_fields() -> Vec<(&'static str, FieldType)> {
    one_param(
        "rows",
        FieldType::map(FieldType::param("K"), FieldType::param("V")),
    )
}

static TABLE: EffectClass = EffectClass::new("Table")
    .with_params(&["K", "V"])
    .with_fields(table_fields);

impl<K: Value, V: Value> Effect for Table<K, V> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &TABLE
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("rows", self.0.reflect())]
    }
}

// Tags[T] with `tags: Set[T]`
#[derive(Debug)]
struct Tags<T>(HashSet<T>);

fn tags_fields() -> Vec<(&'static str, FieldType)> {
    one_param("tags", FieldType::set(FieldType::param("T")))
}

static TAGS: EffectClass = EffectClass::new("Tags")
    .with_params(&["T"])
    .with_fields(tags_fields);

impl<T: Value> Effect for Tags<T> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &TAGS
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("tags", self.0.reflect())]
    }
}

// Transform[A, R] with `f: Callable[[A], R]`
#[derive(Debug)]
struct Transform<A, R>(Func<(A,), R>);

fn transform_fields() -> Vec<(&'static str, FieldType)> {
    one_param(
        "f",
        FieldType::callable(vec![FieldType::param("A")], FieldType::param("R")),
    )
}

static TRANSFORM: EffectClass = EffectClass::new("Transform")
    .with_params(&["A", "R"])
    .with_fields(transform_fields);

impl<A: Debug + 'static, R: Debug + 'static> Effect for Transform<A, R> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &TRANSFORM
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("f", self.0.reflect())]
    }
}

// Maybe[T] with `value: T | ()`
#[derive(Debug)]
struct Maybe<T>(Option<T>);

fn maybe_fields() -> Vec<(&'static str, FieldType)> {
    one_param(
        "value",
        FieldType::union(vec![FieldType::param("T"), FieldType::of::<()>()]),
    )
}

static MAYBE: EffectClass = EffectClass::new("Maybe")
    .with_params(&["T"])
    .with_fields(maybe_fields);

impl<T: Value> Effect for Maybe<T> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &MAYBE
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("value", self.0.reflect())]
    }
}

// Marker[T] carries no field to infer from.
#[derive(Debug)]
struct Marker<T>(PhantomData<fn() -> T>);

static MARKER: EffectClass = EffectClass::new("Marker").with_params(&["T"]);

impl<T: Debug + 'static> Effect for Marker<T> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &MARKER
    }
}

// Box whose construction recorded its type argument.
#[derive(Debug)]
struct Tagged(i32);

impl Effect for Tagged {
    type Output = String;

    fn class() -> &'static EffectClass {
        &BOX
    }

    fn type_args(&self) -> Option<Vec<TypeKey>> {
        Some(vec![TypeKey::of::<u8>()])
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("value", self.0.reflect())]
    }
}

// Effects held in fields.
#[derive(Debug)]
struct Query;

#[derive(Debug)]
struct SpecialQuery(Query);

#[derive(Debug)]
struct Plain;

static QUERY: EffectClass = EffectClass::new("Query");
static SPECIAL_QUERY: EffectClass = EffectClass::new("SpecialQuery").extends(&QUERY);
static PLAIN: EffectClass = EffectClass::new("Plain");

impl Effect for Query {
    type Output = ();

    fn class() -> &'static EffectClass {
        &QUERY
    }
}

impl Effect for SpecialQuery {
    type Output = ();

    fn class() -> &'static EffectClass {
        &SPECIAL_QUERY
    }

    fn base(&self) -> Option<&dyn AnyEffect> {
        Some(&self.0)
    }
}

impl Effect for Plain {
    type Output = ();

    fn class() -> &'static EffectClass {
        &PLAIN
    }
}

#[derive(Debug)]
struct Wrap<E>(E);

impl<E: Effect> Effect for Wrap<E> {
    type Output = ();

    fn class() -> &'static EffectClass {
        &BOX
    }

    fn fields(&self) -> Vec<(&'static str, Observed)> {
        vec![("value", Observed::effect(&self.0))]
    }
}

fn key<T: ?Sized + 'static>() -> TypeKey {
    TypeKey::of::<T>()
}

// ============================================================================
// Inference
// ============================================================================

#[test]
fn test_infer_scalar_field() {
    assert_eq!(infer_type_args(&Boxed(5_i32), &BOX, 1), Some(vec![key::<i32>()]));
    assert_eq!(
        infer_type_args(&Boxed("s".to_string()), &BOX, 1),
        Some(vec![key::<String>()])
    );
}

#[test]
fn test_infer_nothing_expected() {
    assert_eq!(infer_type_args(&Marker::<i32>(PhantomData), &MARKER, 0), Some(Vec::new()));
}

#[test]
fn test_infer_multiple_params() {
    let pair = Pair(1_u8, "x".to_string());
    assert_eq!(
        infer_type_args(&pair, &PAIR, 2),
        Some(vec![key::<u8>(), key::<String>()])
    );
    assert_eq!(infer_type_args(&pair, &PAIR, 1), Some(vec![key::<u8>()]));
}

#[test]
fn test_infer_from_list_uses_first_element() {
    assert_eq!(
        infer_type_args(&Listed(vec![3_i64, 4]), &LISTED, 1),
        Some(vec![key::<i64>()])
    );
}

#[test]
fn test_empty_containers_bind_nothing() {
    assert_eq!(infer_type_args(&Listed(Vec::<i64>::new()), &LISTED, 1), None);
    assert_eq!(infer_type_args(&Table(HashMap::<String, f64>::new()), &TABLE, 2), None);
    assert_eq!(infer_type_args(&Tags(HashSet::<char>::new()), &TAGS, 1), None);
}

#[test]
fn test_infer_fixed_tuple() {
    let entry = Keyed(("k".to_string(), 2_u32));
    assert_eq!(
        infer_type_args(&entry, &KEYED, 2),
        Some(vec![key::<String>(), key::<u32>()])
    );
}

#[test]
fn test_infer_variable_tuple_first_writer_wins() {
    let spread = Spread((1_i32, "s".to_string()));
    assert_eq!(infer_type_args(&spread, &SPREAD, 1), Some(vec![key::<i32>()]));
}

#[test]
fn test_infer_map_and_set() {
    let table = Table(HashMap::from([("a".to_string(), 1.5_f64)]));
    assert_eq!(
        infer_type_args(&table, &TABLE, 2),
        Some(vec![key::<String>(), key::<f64>()])
    );

    let tags = Tags(HashSet::from(['x']));
    assert_eq!(infer_type_args(&tags, &TAGS, 1), Some(vec![key::<char>()]));
}

#[test]
fn test_infer_callable_signature() {
    let transform = Transform(Func::new(|(s,): (String,)| s.len()));
    assert_eq!(
        infer_type_args(&transform, &TRANSFORM, 2),
        Some(vec![key::<String>(), key::<usize>()])
    );
}

#[test]
fn test_infer_through_union_annotation() {
    assert_eq!(infer_type_args(&Maybe(Some(3_i16)), &MAYBE, 1), Some(vec![key::<i16>()]));
    // An absent value binds the parameter to the unit type.
    assert_eq!(infer_type_args(&Maybe(None::<i16>), &MAYBE, 1), Some(vec![key::<()>()]));
}

#[test]
fn test_bare_parameter_binds_wrapper_type() {
    assert_eq!(infer_type_args(&Boxed("x"), &BOX, 1), Some(vec![key::<&'static str>()]));
    assert_eq!(
        infer_type_args(&Boxed(Some(1_i32)), &BOX, 1),
        Some(vec![key::<Option<i32>>()])
    );
    assert_eq!(
        infer_type_args(&Boxed(None::<i32>), &BOX, 1),
        Some(vec![key::<Option<i32>>()])
    );
    assert_eq!(
        infer_type_args(&Boxed(Arc::new(1_i32)), &BOX, 1),
        Some(vec![key::<Arc<i32>>()])
    );
    assert_eq!(
        infer_type_args(&Boxed(Box::new(1_i32)), &BOX, 1),
        Some(vec![key::<Box<i32>>()])
    );
    assert_eq!(describe(&Boxed("x")), "Box[&str]");
}

#[test]
fn test_containers_look_through_wrappers() {
    let mut bindings = Bindings::new();
    let list = FieldType::list(FieldType::param("T"));
    collect_bindings(&list, &Arc::new(vec![1_u16]).reflect(), &mut bindings);
    assert_eq!(bindings.get("T"), Some(&key::<u16>()));

    assert_eq!(
        infer_type_args(&Listed(vec![Some("a")]), &LISTED, 1),
        Some(vec![key::<Option<&'static str>>()])
    );
}

#[test]
fn test_wrapped_arguments_match_their_specialization() {
    assert!(AcceptSpec::of::<Boxed<&'static str>>().matches(&Boxed("x")));
    assert!(AcceptSpec::of::<Boxed<Option<i32>>>().matches(&Boxed(Some(1_i32))));
    assert!(!AcceptSpec::of::<Boxed<i32>>().matches(&Boxed(Some(1_i32))));
    assert!(!AcceptSpec::of::<Boxed<String>>().matches(&Boxed("x")));
}

#[test]
fn test_cached_type_args_win() {
    assert_eq!(infer_type_args(&Tagged(7), &BOX, 1), Some(vec![key::<u8>()]));
    assert_eq!(infer_from_fields(&Tagged(7), &BOX, 1), Some(vec![key::<i32>()]));
}

#[test]
fn test_infer_without_fields_fails() {
    assert_eq!(infer_type_args(&Marker::<i32>(PhantomData), &MARKER, 1), None);
    assert_eq!(infer_from_fields(&Query, &QUERY, 1), None);
}

#[test]
fn test_tuple_arity_mismatch_binds_nothing() {
    let annotation = FieldType::tuple(vec![FieldType::param("K")]);
    let mut bindings = Bindings::new();
    collect_bindings(&annotation, &(1_i32, 2_i32).reflect(), &mut bindings);
    assert!(bindings.is_empty());
}

#[test]
fn test_callable_arity_mismatch_still_binds_return() {
    let annotation = FieldType::callable(
        vec![FieldType::param("A"), FieldType::param("B")],
        FieldType::param("R"),
    );
    let mut bindings = Bindings::new();
    let f: Func<(u8,), bool> = Func::new(|(n,)| n > 0);
    collect_bindings(&annotation, &f.reflect(), &mut bindings);
    assert_eq!(bindings.get("R"), Some(&key::<bool>()));
    assert!(!bindings.contains_key("A"));
}

// ============================================================================
// Matching
// ============================================================================

#[test]
fn test_specialized_spec_matches_by_argument() {
    let ints = AcceptSpec::of::<Boxed<i32>>();
    assert!(ints.matches(&Boxed(1_i32)));
    assert!(!ints.matches(&Boxed("s".to_string())));
    assert!(!ints.matches(&Plain));
}

#[test]
fn test_wildcards_and_unions() {
    let any = normalize(&Accept::applied(&BOX, vec![TypeArg::Any])).unwrap();
    assert!(any[0].matches(&Boxed(1.0_f32)));

    let placeholder = normalize(&Accept::applied(&BOX, vec![TypeArg::Param("T")])).unwrap();
    assert!(placeholder[0].matches(&Boxed('c')));

    let union = TypeArg::Union(vec![TypeArg::of::<i32>(), TypeArg::of::<String>()]);
    let specs = normalize(&Accept::applied(&BOX, vec![union])).unwrap();
    assert!(specs[0].matches(&Boxed(1_i32)));
    assert!(specs[0].matches(&Boxed(String::new())));
    assert!(!specs[0].matches(&Boxed(1.0_f64)));
}

#[test]
fn test_effect_arguments_match_subclasses() {
    let specs = normalize(&Accept::applied(&BOX, vec![TypeArg::effect(&QUERY)])).unwrap();
    assert!(specs[0].matches(&Wrap(Query)));
    assert!(specs[0].matches(&Wrap(SpecialQuery(Query))));
    assert!(!specs[0].matches(&Wrap(Plain)));
}

#[test]
fn test_uninferable_arguments() {
    // No field can tell specializations apart: accepted.
    let specs =
        normalize(&Accept::applied(&MARKER, vec![TypeArg::of::<i32>()])).unwrap();
    assert!(specs[0].matches(&Marker::<String>(PhantomData)));

    // A parameter field that stayed unbound: rejected.
    let lists = normalize(&Accept::applied(&LISTED, vec![TypeArg::of::<i64>()])).unwrap();
    assert!(!lists[0].matches(&Listed(Vec::<i64>::new())));
    assert!(lists[0].matches(&Listed(vec![1_i64])));
}

#[test]
fn test_plain_class_spec_ignores_arguments() {
    let spec = AcceptSpec::class(&BOX);
    assert!(spec.matches(&Boxed(1_i32)));
    assert!(!spec.matches(&Listed(vec![1_i32])));
}

#[test]
fn test_root_spec_matches_everything() {
    let specs = normalize(&Accept::any()).unwrap();
    assert!(specs[0].matches(&Plain));
    assert!(specs[0].matches(&Boxed(0_u64)));
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_normalize_flattens_unions() {
    let accept = Accept::from(&QUERY)
        .or(Accept::applied(&BOX, vec![TypeArg::of::<i32>()]))
        .or(Accept::Union(vec![Accept::from(&PLAIN)]));
    let specs = normalize(&accept).unwrap();
    let names: Vec<String> = specs.iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["Query", "Box[i32]", "Plain"]);
}

#[test]
fn test_normalize_rejects_foreign_types() {
    let accept = Accept::from(&QUERY).or(Accept::foreign::<String>());
    assert_eq!(
        normalize(&accept),
        Err(ConfigurationError::NotAnEffect {
            found: "String".to_string()
        })
    );
}

#[test]
fn test_normalize_rejects_empty_acceptance() {
    assert_eq!(
        normalize(&Accept::Union(Vec::new())),
        Err(ConfigurationError::EmptyAcceptance)
    );
}

#[test]
fn test_normalize_rejects_too_many_arguments() {
    let accept = Accept::applied(&BOX, vec![TypeArg::of::<i32>(), TypeArg::of::<String>()]);
    assert_eq!(
        normalize(&accept),
        Err(ConfigurationError::TooManyTypeArguments {
            class: "Box",
            declared: 1,
            given: 2,
        })
    );
}

#[test]
fn test_partial_arguments_are_allowed() {
    let accept = Accept::applied(&PAIR, vec![TypeArg::of::<u8>()]);
    let specs = normalize(&accept).unwrap();
    assert!(specs[0].matches(&Pair(1_u8, 'x')));
    assert!(!specs[0].matches(&Pair(1_i8, 'x')));
}

// ============================================================================
// Descriptions
// ============================================================================

#[test]
fn test_describe_effects() {
    assert_eq!(describe(&Boxed(5_i32)), "Box[i32]");
    assert_eq!(describe(&Pair(1_u8, "x".to_string())), "Pair[u8, String]");
    assert_eq!(describe(&Tagged(7)), "Box[u8]");
    assert_eq!(describe(&Listed(Vec::<i64>::new())), "Listed([])");
    assert_eq!(describe(&Plain), "Plain");
}

#[test]
fn test_display_forms() {
    let union = TypeArg::Union(vec![TypeArg::of::<i32>(), TypeArg::of::<String>()]);
    assert_eq!(union.to_string(), "i32 | String");
    assert_eq!(AcceptSpec::of::<Boxed<Vec<String>>>().to_string(), "Box[Vec<String>]");
    assert_eq!(key::<Vec<Option<u8>>>().to_string(), "Vec<Option<u8>>");
}

#[test]
fn test_short_name() {
    assert_eq!(short_name("alloc::vec::Vec<alloc::string::String>"), "Vec<String>");
    assert_eq!(short_name("(i32, core::option::Option<u8>)"), "(i32, Option<u8>)");
    assert_eq!(short_name("&'static str"), "&'static str");
    assert_eq!(short_name("u64"), "u64");
}

#[test]
fn test_type_key_subtyping() {
    assert!(TypeKey::effect(&SPECIAL_QUERY).is_subtype_of(&TypeKey::effect(&QUERY)));
    assert!(!TypeKey::effect(&QUERY).is_subtype_of(&TypeKey::effect(&SPECIAL_QUERY)));
    assert!(!key::<i32>().is_subtype_of(&key::<i64>()));
    assert!(!key::<i32>().is_subtype_of(&TypeKey::effect(&QUERY)));
}
