use super::{mismatch, write_string, ObjectWriter, Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind, View};
use crate::materialize::Context;
use crate::sink::Sink;

/// Enum constants, by name. With `enum_as_class_object` the name is wrapped as
/// `{"name": ..., "<key>": "<enum type>"}`.
pub(super) struct EnumTransformer;

impl Transformer for EnumTransformer {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Enum
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        let View::Enum(constant) = value.view() else {
            return Err(mismatch("enum constant", value));
        };
        if !cx.settings.policy.enum_as_class_object {
            return write_string(out, constant);
        }

        let mut object = ObjectWriter::begin(out)?;
        object.member_with("name", |out| write_string(out, constant))?;
        object.tag(value.type_name(), cx)?;
        object.close()
    }
}
