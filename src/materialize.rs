//! Turning a parsed mapping into a typed instance.
//!
//! The concrete type is resolved, in order, from an instance factory registered under the
//! caller's hint, an instance factory registered under the discriminator, the type catalog (or
//! an adapter) by discriminator, and finally the type catalog by hint. When none of these
//! resolves, [`materialize`] hands back the raw mapping as a [`Value::Object`].
//!
//! [`materialize_tree`] applies the same resolution to every object of a parsed tree that
//! carries the discriminator, however deeply it is nested.
//!
//! Once an instance exists, its writable properties are filled from the mapping. A member
//! that fails to coerce aborts the whole call, so a partially filled instance is never
//! returned.

use indexmap::IndexMap;
use tracing::*;

use crate::coerce::Coerce;
use crate::error::{Error, Result};
use crate::groups::Groups;
use crate::jsonable::Jsonable;
use crate::registry;
use crate::schema::DateSpec;
use crate::settings::Settings;
use crate::value::{Object, Value};

/// What a read or write consults besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub settings: &'a Settings,
    pub groups: &'a Groups,
    /// The date format of the member being handled, if it declared one.
    pub date: Option<&'a DateSpec>,
}

impl<'a> Context<'a> {
    pub fn new(settings: &'a Settings, groups: &'a Groups) -> Self {
        Context {
            settings,
            groups,
            date: None,
        }
    }

    pub fn with_date<'b>(&self, date: Option<&'b DateSpec>) -> Context<'b>
    where
        'a: 'b,
    {
        Context {
            settings: self.settings,
            groups: self.groups,
            date,
        }
    }
}

/// Types that can be built from a mapping and are known by a name.
pub trait Materialize: Jsonable + Sized {
    /// Written as the discriminator and resolved through the type catalog.
    const NAME: &'static str;

    fn materialize(mapping: &Object, cx: &Context<'_>) -> Result<Self>;
}

/// Build a typed instance for `mapping`, or give back the mapping itself when no type
/// resolves. Coercion and accessor failures still surface.
pub fn materialize(
    mapping: &Object,
    hint: Option<&str>,
    cx: &Context<'_>,
) -> Result<Box<dyn Jsonable>> {
    match materialize_strict(mapping, hint, cx) {
        Err(Error::Unresolved { type_name }) => {
            debug!(%type_name, "no type resolved, keeping the raw mapping");
            Ok(Box::new(Value::Object(mapping.clone())))
        }
        other => other,
    }
}

/// Like [`materialize`], but fails with [`Error::Unresolved`] instead of degrading.
pub fn materialize_strict(
    mapping: &Object,
    hint: Option<&str>,
    cx: &Context<'_>,
) -> Result<Box<dyn Jsonable>> {
    let discriminator = mapping
        .get(cx.settings.discriminator_key())
        .and_then(Value::as_str);
    // Dates are member-scoped; the members of this instance declare their own.
    let cx = cx.with_date(None);

    for name in hint.into_iter().chain(discriminator) {
        let Some(factory) = cx.settings.factory(name) else {
            continue;
        };
        if let Some(mut instance) = factory(mapping) {
            trace!(name, "instance from factory");
            fill(&mut *instance, mapping, &cx)?;
            return Ok(instance);
        }
    }

    for name in discriminator.into_iter().chain(hint) {
        if let Some(entry) = registry::lookup(name) {
            trace!(name, "instance from type catalog");
            return entry.materialize(mapping, &cx);
        }
        if let Some(adapter) = cx.settings.adapter_named(name) {
            trace!(name, "instance from adapter");
            let mut instance = adapter.create();
            fill(&mut *instance, mapping, &cx)?;
            return Ok(instance);
        }
    }

    Err(Error::Unresolved {
        type_name: discriminator.or(hint).unwrap_or("<none>").to_string(),
    })
}

/// Fill the writable properties of `target` admitted by the requested groups from `mapping`.
/// Absent and `null` members are left untouched. Types without properties are filled through
/// [`Jsonable::fill_members`].
pub fn fill(target: &mut dyn Jsonable, mapping: &Object, cx: &Context<'_>) -> Result<()> {
    let properties = registry::properties_of(&*target, cx.settings);
    if properties.is_empty() {
        return target.fill_members(mapping, cx);
    }

    for property in &properties {
        if !property.can_write() || !cx.groups.admits(property.groups()) {
            continue;
        }
        let Some(raw) = mapping.get(property.name()) else {
            continue;
        };
        if raw.is_null() {
            continue;
        }
        property
            .write(target.as_any_mut(), raw, &cx.with_date(property.date()))
            .map_err(|e| e.at(property.name()))?;
    }
    Ok(())
}

/// Materialize `mapping` as a `T`, using `T` as the hint. Fails with
/// [`Error::TypeMismatch`] when the mapping names another registered type.
pub fn typed<T: Materialize>(mapping: &Object, cx: &Context<'_>) -> Result<T> {
    registry::register::<T>();
    let instance = materialize_strict(mapping, Some(T::NAME), cx)?;
    let found = instance.type_name();
    instance.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
        expected: T::NAME,
        found: found.to_string(),
    })
}

/// [`Coerce`] for object-shaped types.
pub fn coerce_object<T: Materialize>(raw: &Value, cx: &Context<'_>) -> Result<T> {
    match raw {
        Value::Object(mapping) => typed::<T>(mapping, cx),
        other => Err(Error::coercion(T::NAME, other)),
    }
}

/// Whether `raw` holds an object carrying the discriminator `key`, at any depth.
fn names_a_type(raw: &Value, key: &str) -> bool {
    match raw {
        Value::Object(mapping) => {
            mapping.contains_key(key) || mapping.values().any(|member| names_a_type(member, key))
        }
        Value::Array(items) => items.iter().any(|item| names_a_type(item, key)),
        _ => false,
    }
}

/// Materialize every object of `raw` that carries the discriminator, at any depth.
///
/// A subtree without such objects is kept as a generic [`Value`]. Containers above a
/// materialized instance become `Vec<Box<dyn Jsonable>>` and
/// `IndexMap<String, Box<dyn Jsonable>>`, so the instance is reachable by downcasting. An
/// object whose discriminator resolves to no type is treated as such a container.
pub fn materialize_tree(raw: &Value, cx: &Context<'_>) -> Result<Box<dyn Jsonable>> {
    let key = cx.settings.discriminator_key();
    if !names_a_type(raw, key) {
        return Ok(Box::new(raw.clone()));
    }

    match raw {
        Value::Object(mapping) => {
            if mapping.contains_key(key) {
                match materialize_strict(mapping, None, cx) {
                    Err(Error::Unresolved { type_name }) => {
                        debug!(%type_name, "no type resolved, keeping the mapping");
                    }
                    other => return other,
                }
                if !mapping.values().any(|member| names_a_type(member, key)) {
                    return Ok(Box::new(raw.clone()));
                }
            }
            let members = mapping
                .iter()
                .map(|(name, member)| {
                    materialize_tree(member, cx)
                        .map(|member| (name.clone(), member))
                        .map_err(|e| e.at(name))
                })
                .collect::<Result<IndexMap<String, Box<dyn Jsonable>>>>()?;
            Ok(Box::new(members))
        }
        Value::Array(items) => {
            let items = items
                .iter()
                .enumerate()
                .map(|(i, item)| materialize_tree(item, cx).map_err(|e| e.at(&format!("[{i}]"))))
                .collect::<Result<Vec<Box<dyn Jsonable>>>>()?;
            Ok(Box::new(items))
        }
        other => Ok(Box::new(other.clone())),
    }
}

/// Untyped members are materialized through [`materialize_tree`].
impl Coerce for Box<dyn Jsonable> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        materialize_tree(raw, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn mapping(src: &str) -> Object {
        match parse(src).unwrap() {
            Value::Object(mapping) => mapping,
            other => panic!("not an object: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_discriminator_degrades_to_the_mapping() {
        let settings = Settings::default();
        let groups = Groups::none();
        let cx = Context::new(&settings, &groups);
        let raw = mapping(r#"{"a": 1, "class": "NoSuchType"}"#);

        let instance = materialize(&raw, None, &cx).unwrap();
        assert_eq!(instance.downcast_ref::<Value>(), Some(&Value::Object(raw.clone())));

        let err = materialize_strict(&raw, None, &cx).unwrap_err();
        assert!(matches!(err, Error::Unresolved { type_name } if type_name == "NoSuchType"));
    }

    #[test]
    fn test_boxed_primitive_keeps_its_width() {
        let settings = Settings::default();
        let groups = Groups::none();
        let cx = Context::new(&settings, &groups);

        let instance = materialize(&mapping(r#"{"value": 1, "class": "i32"}"#), None, &cx).unwrap();
        assert_eq!(instance.downcast_ref::<i32>(), Some(&1));

        let err = materialize(&mapping(r#"{"value": 300, "class": "u8"}"#), None, &cx).unwrap_err();
        assert!(matches!(err, Error::Coercion { expected: "u8", .. }), "{err}");
    }

    #[test]
    fn test_factory_wins_over_the_catalog() {
        let mut settings = Settings::default();
        settings.register_factory("i32", |_| Some(Box::new(String::from("from factory"))));
        let groups = Groups::none();
        let cx = Context::new(&settings, &groups);

        let instance = materialize(&mapping(r#"{"value": 1, "class": "i32"}"#), None, &cx).unwrap();
        assert_eq!(
            instance.downcast_ref::<String>().map(String::as_str),
            Some("from factory")
        );
    }

    #[test]
    fn test_untyped_arrays_materialize_their_elements() {
        let settings = Settings::default();
        let groups = Groups::none();
        let cx = Context::new(&settings, &groups);
        let raw = parse(r#"[{"value": 2, "class": "u8"}, "x", {"a": 1}]"#).unwrap();

        let instance = <Box<dyn Jsonable>>::coerce(&raw, &cx).unwrap();
        let elements = instance.downcast_ref::<Vec<Box<dyn Jsonable>>>().unwrap();
        assert_eq!(elements[0].downcast_ref::<u8>(), Some(&2));
        assert_eq!(elements[1].downcast_ref::<Value>(), Some(&Value::from("x")));
        assert!(elements[2].is::<Value>());
    }

    #[test]
    fn test_nested_discriminated_objects_materialize() {
        let settings = Settings::default();
        let groups = Groups::none();
        let cx = Context::new(&settings, &groups);

        let raw = parse(r#"{"a": {"value": 1, "class": "i32"}, "b": [1, 2]}"#).unwrap();
        let instance = materialize_tree(&raw, &cx).unwrap();
        let members = instance
            .downcast_ref::<IndexMap<String, Box<dyn Jsonable>>>()
            .unwrap();
        assert_eq!(members["a"].downcast_ref::<i32>(), Some(&1));
        assert_eq!(members["b"].downcast_ref::<Value>(), Some(&Value::from(vec![1, 2])));

        // An unknown type keeps its own members but still resolves the ones below it.
        let raw = parse(r#"{"class": "NoSuchType", "inner": [{"value": 3, "class": "i64"}]}"#)
            .unwrap();
        let instance = materialize_tree(&raw, &cx).unwrap();
        let members = instance
            .downcast_ref::<IndexMap<String, Box<dyn Jsonable>>>()
            .unwrap();
        assert_eq!(members["class"].downcast_ref::<Value>(), Some(&Value::from("NoSuchType")));
        let inner = members["inner"]
            .downcast_ref::<Vec<Box<dyn Jsonable>>>()
            .unwrap();
        assert_eq!(inner[0].downcast_ref::<i64>(), Some(&3));

        let err = materialize_tree(&parse(r#"[[{"value": 300, "class": "u8"}]]"#).unwrap(), &cx)
            .unwrap_err();
        assert!(err.to_string().ends_with("at `[0][0]`"), "{err}");
    }

    #[test]
    fn test_typed_rejects_another_registered_type() {
        let settings = Settings::default();
        let groups = Groups::none();
        let cx = Context::new(&settings, &groups);

        assert_eq!(typed::<i64>(&mapping(r#"{"value": 5}"#), &cx).unwrap(), 5);
        let err = typed::<i64>(&mapping(r#"{"value": 5, "class": "i32"}"#), &cx).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "i64", found } if found == "i32"));
    }
}
