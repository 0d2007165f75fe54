use super::{ObjectWriter, Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind};
use crate::materialize::Context;
use crate::sink::Sink;

/// Fallback for everything else: the plain members listed by [`Jsonable::fields`].
pub(super) struct ObjectTransformer;

impl Transformer for ObjectTransformer {
    fn name(&self) -> &'static str {
        "object"
    }

    fn priority(&self) -> i32 {
        i32::MAX
    }

    fn matches(&self, _probe: &Probe) -> bool {
        true
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        let include_null = cx.settings.policy.include_null_fields;
        let mut object = ObjectWriter::begin(out)?;
        for (name, member) in value.fields() {
            if member.kind() == Kind::Null && !include_null {
                continue;
            }
            object.member(name, member, cx)?;
        }
        object.finish(value.type_name(), cx)
    }
}
