use super::described::write_properties;
use super::{Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind};
use crate::materialize::Context;
use crate::sink::Sink;

/// Types without a schema of their own that the settings hold an adapter for.
pub(super) struct AdapterTransformer;

impl Transformer for AdapterTransformer {
    fn name(&self) -> &'static str {
        "adapter"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Object && probe.adapted && !probe.described
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        write_properties(value, out, cx)
    }
}
