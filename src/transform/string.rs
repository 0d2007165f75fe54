use super::{mismatch, write_string, Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind, View};
use crate::materialize::Context;
use crate::sink::Sink;

pub(super) struct StringTransformer;

impl Transformer for StringTransformer {
    fn name(&self) -> &'static str {
        "string"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Str
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, _cx: &Context<'_>) -> Result<()> {
        match value.view() {
            View::Str(text) => write_string(out, text),
            _ => Err(mismatch("string", value)),
        }
    }
}
