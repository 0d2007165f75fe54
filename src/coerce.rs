//! Converting parsed values into the declared types of members.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::jsonable::Constant;
use crate::materialize::{typed, Context, Materialize};
use crate::schema::DateSpec;
use crate::value::{Object, Value};

pub trait Coerce: Sized {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self>;
}

/// Scalars also accept their boxed form, `{"value": v, ...}`.
fn unbox(raw: &Value) -> &Value {
    match raw {
        Value::Object(mapping) => mapping.get("value").unwrap_or(raw),
        other => other,
    }
}

fn truthy(text: &str) -> bool {
    !(text.is_empty() || text == "0" || text.eq_ignore_ascii_case("false"))
}

/// Any scalar is read by the truthiness of its text.
impl Coerce for bool {
    fn coerce(raw: &Value, _cx: &Context<'_>) -> Result<Self> {
        let raw = unbox(raw);
        match raw {
            Value::Bool(b) => Ok(*b),
            scalar => scalar
                .scalar_text()
                .map(|text| truthy(text.trim()))
                .ok_or_else(|| Error::coercion("bool", scalar)),
        }
    }
}

macro_rules! integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Coerce for $ty {
                fn coerce(raw: &Value, _cx: &Context<'_>) -> Result<Self> {
                    let raw = unbox(raw);
                    let wide = match raw {
                        Value::Integer(i) => Some(i128::from(*i)),
                        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i128),
                        Value::String(s) => s.trim().parse::<i128>().ok(),
                        _ => None,
                    };
                    wide.and_then(|w| <$ty>::try_from(w).ok())
                        .ok_or_else(|| Error::coercion(stringify!($ty), raw))
                }
            }
        )*
    };
}

integer!(i8, i16, i32, i64, u8, u16, u32, u64);

fn to_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Coerce for f64 {
    fn coerce(raw: &Value, _cx: &Context<'_>) -> Result<Self> {
        let raw = unbox(raw);
        to_f64(raw).ok_or_else(|| Error::coercion("f64", raw))
    }
}

impl Coerce for f32 {
    fn coerce(raw: &Value, _cx: &Context<'_>) -> Result<Self> {
        let raw = unbox(raw);
        match to_f64(raw) {
            // Narrowing must not overflow into an infinity.
            Some(wide) if wide.is_finite() && !(wide as f32).is_finite() => {
                Err(Error::coercion("f32", raw))
            }
            Some(wide) => Ok(wide as f32),
            None => Err(Error::coercion("f32", raw)),
        }
    }
}

impl Coerce for char {
    fn coerce(raw: &Value, _cx: &Context<'_>) -> Result<Self> {
        let raw = unbox(raw);
        let mut chars = raw.as_str().unwrap_or_default().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::coercion("char", raw)),
        }
    }
}

/// Strings arrive unescaped from the tokenizer; other scalars are taken by their text.
impl Coerce for String {
    fn coerce(raw: &Value, _cx: &Context<'_>) -> Result<Self> {
        match raw {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) => {
                raw.scalar_text().ok_or_else(|| Error::coercion("string", raw))
            }
            other => Err(Error::coercion("string", other)),
        }
    }
}

impl Coerce for Value {
    fn coerce(raw: &Value, _cx: &Context<'_>) -> Result<Self> {
        Ok(raw.clone())
    }
}

impl<T: Coerce> Coerce for Option<T> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        match raw {
            Value::Null => Ok(None),
            other => T::coerce(other, cx).map(Some),
        }
    }
}

fn parse_formatted(text: &str, pattern: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, pattern) {
        return Some(datetime.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, pattern) {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_str(text, pattern)
        .ok()
        .map(|datetime| datetime.with_timezone(&Utc))
}

fn parse_rfc3339(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|datetime| datetime.with_timezone(&Utc))
}

/// Dates follow the member's [`DateSpec`]. Without one, integers are epoch milliseconds and
/// strings are RFC 3339.
impl Coerce for DateTime<Utc> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        let parsed = match (cx.date, raw) {
            (_, Value::Integer(millis)) => DateTime::from_timestamp_millis(*millis),
            (Some(DateSpec::Formatted(pattern)), Value::String(s)) if pattern.is_empty() => {
                parse_rfc3339(s)
            }
            (Some(DateSpec::Formatted(pattern)), Value::String(s)) => parse_formatted(s, pattern),
            (Some(DateSpec::Timestamp), Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(DateTime::from_timestamp_millis),
            (None, Value::String(s)) => parse_rfc3339(s),
            _ => None,
        };
        parsed.ok_or_else(|| Error::coercion("date", raw))
    }
}

fn elements<T, C>(raw: &Value, cx: &Context<'_>, expected: &'static str) -> Result<C>
where
    T: Coerce,
    C: FromIterator<T>,
{
    let items = raw
        .as_array()
        .ok_or_else(|| Error::coercion(expected, raw))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| T::coerce(item, cx).map_err(|e| e.at(&format!("[{i}]"))))
        .collect()
}

impl<T: Coerce> Coerce for Vec<T> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        elements(raw, cx, "list")
    }
}

impl<T: Coerce> Coerce for VecDeque<T> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        elements(raw, cx, "collection")
    }
}

impl<T: Coerce + Eq + Hash> Coerce for HashSet<T> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        elements(raw, cx, "set")
    }
}

impl<T: Coerce + Ord> Coerce for BTreeSet<T> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        elements(raw, cx, "set")
    }
}

impl<T: Coerce, const N: usize> Coerce for [T; N] {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        let items: Vec<T> = elements(raw, cx, "array")?;
        items
            .try_into()
            .map_err(|_| Error::coercion("array of fixed length", raw))
    }
}

/// Typed maps skip `null` members, mirroring how maps are written.
fn members<V, M>(raw: &Value, cx: &Context<'_>) -> Result<M>
where
    V: Coerce,
    M: FromIterator<(String, V)>,
{
    let mapping = raw.as_object().ok_or_else(|| Error::coercion("map", raw))?;
    mapping
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            V::coerce(value, cx)
                .map(|value| (key.clone(), value))
                .map_err(|e| e.at(key))
        })
        .collect()
}

impl<V: Coerce> Coerce for HashMap<String, V> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        members(raw, cx)
    }
}

impl<V: Coerce> Coerce for BTreeMap<String, V> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        members(raw, cx)
    }
}

impl<V: Coerce> Coerce for IndexMap<String, V> {
    fn coerce(raw: &Value, cx: &Context<'_>) -> Result<Self> {
        members(raw, cx)
    }
}

/// Enum constants are read from their name, or from their object form `{"name": ...}`.
pub fn coerce_constant<T: Constant + Materialize>(raw: &Value, cx: &Context<'_>) -> Result<T> {
    match raw {
        Value::String(name) => T::from_constant(name).ok_or_else(|| Error::coercion(T::NAME, raw)),
        Value::Object(mapping) => typed::<T>(mapping, cx),
        other => Err(Error::coercion(T::NAME, other)),
    }
}

/// The object form of an enum constant.
pub fn constant_from_mapping<T: Constant + Materialize>(mapping: &Object) -> Result<T> {
    let name = mapping.get("name").unwrap_or(&Value::Null);
    name.as_str()
        .and_then(T::from_constant)
        .ok_or_else(|| Error::coercion(T::NAME, name))
}

macro_rules! boxed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Materialize for $ty {
                const NAME: &'static str = stringify!($ty);

                fn materialize(mapping: &Object, cx: &Context<'_>) -> Result<Self> {
                    <$ty>::coerce(mapping.get("value").unwrap_or(&Value::Null), cx)
                }
            }
        )*
    };
}

boxed!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, char);

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::groups::Groups;
    use crate::parser::parse;
    use crate::settings::Settings;

    fn coerce<T: Coerce>(src: &str) -> Result<T> {
        let settings = Settings::default();
        let groups = Groups::none();
        T::coerce(&parse(src).unwrap(), &Context::new(&settings, &groups))
    }

    #[test]
    fn test_boolean_truthiness() {
        assert!(coerce::<bool>("true").unwrap());
        assert!(!coerce::<bool>("\"\"").unwrap());
        assert!(!coerce::<bool>("\"0\"").unwrap());
        assert!(!coerce::<bool>("\"FALSE\"").unwrap());
        assert!(coerce::<bool>("\"yes\"").unwrap());
        assert!(!coerce::<bool>("0").unwrap());
        assert!(coerce::<bool>("7").unwrap());
        assert!(!coerce::<bool>("0.0").unwrap());
        assert!(coerce::<bool>("0.5").unwrap());
        assert!(coerce::<bool>("[true]").is_err());
        assert!(coerce::<bool>(r#"{"value": true, "class": "bool"}"#).unwrap());
    }

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(coerce::<i8>("-128").unwrap(), -128);
        assert_eq!(coerce::<u16>("\"65535\"").unwrap(), 65535);
        assert_eq!(coerce::<i32>("3.0").unwrap(), 3);
        assert!(coerce::<i8>("128").is_err());
        assert!(coerce::<u32>("-1").is_err());
        assert!(coerce::<i64>("2.5").is_err());
        assert!(coerce::<i32>("true").is_err());
        assert_eq!(coerce::<u64>("18446744073709551615").unwrap(), u64::MAX);
        assert!(coerce::<u64>("18446744073709551616").is_err());
        assert_eq!(coerce::<f64>("18446744073709551616").unwrap(), 18446744073709551616.0);
    }

    #[test]
    fn test_float_widening_and_narrowing() {
        assert_eq!(coerce::<f64>("2").unwrap(), 2.0);
        assert_eq!(coerce::<f32>("0.5").unwrap(), 0.5);
        assert_eq!(coerce::<f64>("\"1.25\"").unwrap(), 1.25);
        assert!(coerce::<f32>("1000000000000000000000000000000000000000.0").is_err());
    }

    #[test]
    fn test_char_needs_exactly_one_character() {
        assert_eq!(coerce::<char>("\"x\"").unwrap(), 'x');
        assert!(coerce::<char>("\"xy\"").is_err());
        assert!(coerce::<char>("\"\"").is_err());
    }

    #[test]
    fn test_string_takes_scalar_text() {
        assert_eq!(coerce::<String>(r#""a\"b""#).unwrap(), "a\"b");
        assert_eq!(coerce::<String>("42").unwrap(), "42");
        assert!(coerce::<String>("[1]").is_err());
    }

    #[test]
    fn test_collections_coerce_element_wise() {
        assert_eq!(coerce::<Vec<i32>>("[1,2,3]").unwrap(), vec![1, 2, 3]);
        assert_eq!(
            coerce::<BTreeSet<i32>>("[3,1,3,2,1]").unwrap(),
            BTreeSet::from([1, 2, 3])
        );
        assert_eq!(coerce::<HashSet<String>>(r#"["a","a"]"#).unwrap().len(), 1);
        assert_eq!(coerce::<[u8; 2]>("[1,2]").unwrap(), [1, 2]);
        assert!(coerce::<[u8; 2]>("[1,2,3]").is_err());
        assert_eq!(
            coerce::<Vec<Option<i32>>>("[1,null]").unwrap(),
            vec![Some(1), None]
        );

        let err = coerce::<Vec<Vec<u8>>>("[[1],[2,300]]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot coerce integer `300` into `u8` at `[1][1]`"
        );
    }

    #[test]
    fn test_maps_coerce_per_member() {
        let map = coerce::<IndexMap<String, i64>>(r#"{"b": 2, "a": 1, "c": null}"#).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["b", "a"]);

        let err = coerce::<BTreeMap<String, u8>>(r#"{"ok": 1, "bad": -1}"#).unwrap_err();
        assert!(err.to_string().ends_with("at `bad`"), "{err}");
    }

    #[test]
    fn test_dates() {
        let expected = Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap();
        let settings = Settings::default();
        let groups = Groups::none();
        let cx = Context::new(&settings, &groups);

        let millis = Value::Integer(expected.timestamp_millis());
        assert_eq!(DateTime::<Utc>::coerce(&millis, &cx).unwrap(), expected);

        let rfc = Value::from("2020-05-17T08:30:00Z");
        assert_eq!(DateTime::<Utc>::coerce(&rfc, &cx).unwrap(), expected);

        let spec = DateSpec::formatted("%Y-%m-%d %H:%M");
        let formatted = Value::from("2020-05-17 08:30");
        assert_eq!(
            DateTime::<Utc>::coerce(&formatted, &cx.with_date(Some(&spec))).unwrap(),
            expected
        );

        let day_only = DateSpec::formatted("%d/%m/%Y");
        assert_eq!(
            DateTime::<Utc>::coerce(&Value::from("17/05/2020"), &cx.with_date(Some(&day_only)))
                .unwrap(),
            Utc.with_ymd_and_hms(2020, 5, 17, 0, 0, 0).unwrap()
        );

        let rfc_member = DateSpec::formatted("");
        assert_eq!(
            DateTime::<Utc>::coerce(
                &Value::from("2020-05-17T10:30:00+02:00"),
                &cx.with_date(Some(&rfc_member))
            )
            .unwrap(),
            expected
        );

        assert!(DateTime::<Utc>::coerce(&Value::from("yesterday"), &cx).is_err());
    }
}
