use super::{mismatch, serialize, Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind, View};
use crate::materialize::Context;
use crate::sink::Sink;

/// Sequences and sets, element by element in iteration order.
pub(super) struct SequenceTransformer;

impl Transformer for SequenceTransformer {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Sequence
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        let View::Sequence(elements) = value.view() else {
            return Err(mismatch("sequence", value));
        };
        // A date spec describes the member itself, so it still applies to dates inside it.
        out.emit_char('[')?;
        for (i, element) in elements.into_iter().enumerate() {
            if i > 0 {
                out.emit_char(',')?;
            }
            serialize(element, out, cx)?;
        }
        out.emit_char(']')
    }
}
