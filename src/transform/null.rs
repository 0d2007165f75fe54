use super::{Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind};
use crate::materialize::Context;
use crate::sink::Sink;

pub(super) struct NullTransformer;

impl Transformer for NullTransformer {
    fn name(&self) -> &'static str {
        "null"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Null
    }

    fn write(&self, _value: &dyn Jsonable, out: &mut dyn Sink, _cx: &Context<'_>) -> Result<()> {
        out.emit("null")
    }
}
