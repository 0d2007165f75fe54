use std::fmt::Display;

use super::{mismatch, write_string, ObjectWriter, Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind, Primitive, View};
use crate::materialize::Context;
use crate::sink::Sink;

/// Booleans, numbers and characters. With `include_boxed_primitive_class` the literal is wrapped
/// as `{"value": ..., "<key>": "<type>"}` so its exact width survives a round trip.
pub(super) struct PrimitiveTransformer;

impl Transformer for PrimitiveTransformer {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Primitive
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        let View::Primitive(primitive) = value.view() else {
            return Err(mismatch("primitive", value));
        };
        if !cx.settings.policy.include_boxed_primitive_class {
            return write_literal(out, primitive);
        }

        let mut object = ObjectWriter::begin(out)?;
        object.member_with("value", |out| write_literal(out, primitive))?;
        object.tag(value.type_name(), cx)?;
        object.close()
    }
}

fn write_literal(out: &mut dyn Sink, primitive: Primitive) -> Result<()> {
    match primitive {
        Primitive::Bool(b) => out.emit(if b { "true" } else { "false" }),
        Primitive::Signed(i) => out.emit(&i.to_string()),
        Primitive::Unsigned(u) => out.emit(&u.to_string()),
        Primitive::F32(f) if f.is_finite() => write_float(out, f),
        Primitive::F64(f) if f.is_finite() => write_float(out, f),
        Primitive::F32(_) | Primitive::F64(_) => out.emit("null"),
        Primitive::Char(c) => write_string(out, c.encode_utf8(&mut [0u8; 4])),
    }
}

/// Finite floats always carry a fraction so they read back as floats.
fn write_float(out: &mut dyn Sink, f: impl Display) -> Result<()> {
    let text = f.to_string();
    out.emit(&text)?;
    if !text.contains('.') {
        out.emit(".0")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::groups::Groups;
    use crate::jsonable::Jsonable;
    use crate::materialize::Context;
    use crate::settings::{Policy, Settings};
    use crate::transform::serialize;

    fn written(value: &dyn Jsonable, settings: &Settings) -> String {
        let groups = Groups::none();
        let mut out = String::new();
        serialize(value, &mut out, &Context::new(settings, &groups)).unwrap();
        out
    }

    #[test]
    fn test_literals() {
        let settings = Settings::default();
        assert_eq!(written(&true, &settings), "true");
        assert_eq!(written(&-12i8, &settings), "-12");
        assert_eq!(written(&u64::MAX, &settings), "18446744073709551615");
        assert_eq!(written(&2.5f32, &settings), "2.5");
        assert_eq!(written(&3.0f64, &settings), "3.0");
        assert_eq!(written(&f32::INFINITY, &settings), "null");
        assert_eq!(written(&'"', &settings), r#""\"""#);
    }

    #[test]
    fn test_boxed_form_names_the_width() {
        let settings = Settings::new(Policy {
            include_boxed_primitive_class: true,
            ..Policy::default()
        });
        assert_eq!(written(&1i32, &settings), r#"{"value":1,"class":"i32"}"#);
        assert_eq!(written(&1u8, &settings), r#"{"value":1,"class":"u8"}"#);
        assert_eq!(written(&'x', &settings), r#"{"value":"x","class":"char"}"#);
    }
}
