use super::{ObjectWriter, Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind};
use crate::materialize::Context;
use crate::registry;
use crate::sink::Sink;

/// Types with a declared schema. Adapters registered for one of their levels are laid over it.
pub(super) struct DescribedTransformer;

impl Transformer for DescribedTransformer {
    fn name(&self) -> &'static str {
        "described"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Object && probe.described
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        write_properties(value, out, cx)
    }
}

/// One member per readable property admitted by the requested groups, in property order,
/// followed by the discriminator.
pub(super) fn write_properties(
    value: &dyn Jsonable,
    out: &mut dyn Sink,
    cx: &Context<'_>,
) -> Result<()> {
    let include_null = cx.settings.policy.include_null_fields;
    let mut object = ObjectWriter::begin(out)?;
    for property in registry::properties_of(value, cx.settings) {
        if !cx.groups.admits(property.groups()) {
            continue;
        }
        let Some(member) = property.read(value.as_any()).map_err(|e| e.at(property.name()))? else {
            continue;
        };
        if member.kind() == Kind::Null && !(include_null || property.show_null()) {
            continue;
        }
        object.member(property.name(), &*member, &cx.with_date(property.date()))?;
    }
    object.finish(value.type_name(), cx)
}
