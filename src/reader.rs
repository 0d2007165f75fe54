//! Reading JSON text.
//!
//! One call reads exactly one value: only whitespace may follow it, and an empty source reads as
//! `null`. Every object carrying the discriminator is materialized into the type it names, at
//! any depth (see [`materialize_tree`]); a document without one is returned as a generic
//! [`Value`](crate::Value). Typed reads go through [`Coerce`] instead and never degrade.

use std::io;

use tracing::*;

use crate::coerce::Coerce;
use crate::error::Result;
use crate::groups::Groups;
use crate::jsonable::Jsonable;
use crate::materialize::{materialize_tree, Context};
use crate::parser::parse;
use crate::settings::Settings;

pub fn read(src: &str, settings: &Settings) -> Result<Box<dyn Jsonable>> {
    read_grouped(src, settings, &Groups::none())
}

/// Like [`read`], materializing only the properties admitted by `groups`.
#[instrument(level = "trace", skip_all, fields(len = src.len()))]
pub fn read_grouped(src: &str, settings: &Settings, groups: &Groups) -> Result<Box<dyn Jsonable>> {
    let cx = Context::new(settings, groups);
    materialize_tree(&parse(src)?, &cx)
}

/// Read a `T`. Objects are materialized with `T` as the type hint.
pub fn read_as<T: Coerce>(src: &str, settings: &Settings) -> Result<T> {
    read_as_grouped(src, settings, &Groups::none())
}

#[instrument(level = "trace", skip_all, fields(len = src.len(), target = std::any::type_name::<T>()))]
pub fn read_as_grouped<T: Coerce>(src: &str, settings: &Settings, groups: &Groups) -> Result<T> {
    let value = parse(src)?;
    T::coerce(&value, &Context::new(settings, groups))
}

/// Read one value from a byte source, which must hold UTF-8 text. The source is read to its end
/// first.
pub fn read_from<R: io::Read>(mut reader: R, settings: &Settings) -> Result<Box<dyn Jsonable>> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;
    read(&src, settings)
}

pub fn read_from_as<T: Coerce, R: io::Read>(mut reader: R, settings: &Settings) -> Result<T> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;
    read_as(&src, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ParseErrorKind};
    use crate::value::Value;

    #[test]
    fn test_plain_roots_stay_generic() {
        let settings = Settings::default();
        let value = read(r#"{"a": [1, 2.5, 'x']}"#, &settings).unwrap();
        let expected: Value = [(
            "a",
            Value::from(vec![Value::from(1), Value::from(2.5), Value::from("x")]),
        )]
        .into_iter()
        .collect();
        assert_eq!(value.downcast_ref::<Value>(), Some(&expected));

        let empty = read("  \n", &settings).unwrap();
        assert_eq!(empty.downcast_ref::<Value>(), Some(&Value::Null));
    }

    #[test]
    fn test_one_value_per_read() {
        let err = read("[1] 2", &Settings::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ref e) if e.kind == ParseErrorKind::TrailingCharacters { found: '2' }
        ));
    }

    #[test]
    fn test_custom_discriminator_key() {
        let mut settings = Settings::default();
        settings.policy.discriminator_key = "@type".to_string();
        let value = read(r#"{"value": 7, "@type": "u16"}"#, &settings).unwrap();
        assert_eq!(value.downcast_ref::<u16>(), Some(&7));

        // Under another key the same text is an ordinary mapping.
        let value = read(r#"{"value": 7, "class": "u16"}"#, &settings).unwrap();
        assert!(value.is::<Value>());
    }

    #[test]
    fn test_discriminated_objects_below_the_root() {
        let settings = Settings::default();
        let value = read(r#"[{"value": 1, "class": "i32"}, 'x']"#, &settings).unwrap();
        let items = value.downcast_ref::<Vec<Box<dyn Jsonable>>>().unwrap();
        assert_eq!(items[0].downcast_ref::<i32>(), Some(&1));
        assert_eq!(items[1].downcast_ref::<Value>(), Some(&Value::from("x")));

        let value: Box<dyn Jsonable> =
            read_as(r#"{"a": {"value": 1, "class": "i32"}}"#, &settings).unwrap();
        let members = value
            .downcast_ref::<indexmap::IndexMap<String, Box<dyn Jsonable>>>()
            .unwrap();
        assert_eq!(members["a"].downcast_ref::<i32>(), Some(&1));
    }

    #[test]
    fn test_byte_source() {
        let bytes = "[1, 2, 3]".as_bytes();
        let numbers: Vec<i32> = read_from_as(bytes, &Settings::default()).unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);

        let invalid: &[u8] = &[0x5b, 0xff, 0x5d];
        assert!(matches!(
            read_from(invalid, &Settings::default()),
            Err(Error::Io(_))
        ));
    }
}
