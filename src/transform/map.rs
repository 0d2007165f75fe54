use super::{mismatch, ObjectWriter, Probe, Transformer};
use crate::error::Result;
use crate::jsonable::{Jsonable, Kind, View};
use crate::materialize::Context;
use crate::sink::Sink;

/// String-keyed maps. Entries holding `null` are skipped whatever the null policy says; that
/// policy only governs described objects.
pub(super) struct MapTransformer;

impl Transformer for MapTransformer {
    fn name(&self) -> &'static str {
        "map"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Map
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        let View::Map(entries) = value.view() else {
            return Err(mismatch("map", value));
        };
        let mut object = ObjectWriter::begin(out)?;
        for (key, entry) in entries {
            if entry.kind() == Kind::Null {
                continue;
            }
            object.member(key, entry, cx)?;
        }
        object.close()
    }
}
