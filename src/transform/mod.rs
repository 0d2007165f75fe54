//! Writing values as JSON text.
//!
//! A fixed list of stateless transformers is built once. For each value, the transformers whose
//! predicate accepts the value's [`Probe`] compete, and the lowest priority wins (ties go to the
//! earlier transformer in the list). The winner is cached per probe for the life of the
//! process; since a probe carries everything the predicates look at, a cached decision is
//! always the one a fresh resolution would reach.

mod adapter;
mod date;
mod described;
mod enumeration;
mod map;
mod null;
mod object;
mod primitive;
mod sequence;
mod string;

use std::sync::LazyLock;

use dashmap::DashMap;
use tracing::*;

use crate::error::{Error, Result};
use crate::jsonable::{Jsonable, Kind};
use crate::materialize::Context;
use crate::settings::Settings;
use crate::sink::Sink;

pub trait Transformer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower wins.
    fn priority(&self) -> i32;

    fn matches(&self, probe: &Probe) -> bool;

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()>;
}

/// What dispatch knows about a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Probe {
    pub type_name: &'static str,
    pub kind: Kind,
    /// The type declares a schema.
    pub described: bool,
    /// The settings of this call hold an adapter for the type.
    pub adapted: bool,
}

impl Probe {
    pub fn of(value: &dyn Jsonable, settings: &Settings) -> Self {
        Probe {
            type_name: value.type_name(),
            kind: value.kind(),
            described: value.descriptor().is_some(),
            adapted: settings.has_adapters()
                && settings.adapter(value.as_any().type_id()).is_some(),
        }
    }
}

/// Index of the generic object transformer, which accepts every probe.
const FALLBACK: usize = 0;

static TRANSFORMERS: LazyLock<Vec<Box<dyn Transformer>>> = LazyLock::new(|| {
    vec![
        Box::new(object::ObjectTransformer),
        Box::new(null::NullTransformer),
        Box::new(primitive::PrimitiveTransformer),
        Box::new(string::StringTransformer),
        Box::new(enumeration::EnumTransformer),
        Box::new(date::DateTransformer),
        Box::new(sequence::SequenceTransformer),
        Box::new(map::MapTransformer),
        Box::new(adapter::AdapterTransformer),
        Box::new(described::DescribedTransformer),
    ]
});

static DISPATCH: LazyLock<DashMap<Probe, usize>> = LazyLock::new(DashMap::new);

/// The transformer that writes values matching `probe`.
pub fn transformer_for(probe: &Probe) -> &'static dyn Transformer {
    let transformers = LazyLock::force(&TRANSFORMERS);
    if let Some(index) = DISPATCH.get(probe) {
        return transformers[*index].as_ref();
    }

    let index = transformers
        .iter()
        .enumerate()
        .filter(|(_, t)| t.matches(probe))
        .min_by_key(|(i, t)| (t.priority(), *i))
        .map_or(FALLBACK, |(i, _)| i);
    debug!(
        type_name = probe.type_name,
        kind = ?probe.kind,
        transformer = transformers[index].name(),
        "resolved transformer"
    );
    DISPATCH.insert(*probe, index);
    transformers[index].as_ref()
}

/// Write `value` to `out`.
pub fn serialize(value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
    let probe = Probe::of(value, cx.settings);
    transformer_for(&probe).write(value, out, cx)
}

/// The view of `value` does not agree with the kind it reported.
pub(crate) fn mismatch(expected: &'static str, value: &dyn Jsonable) -> Error {
    Error::TypeMismatch {
        expected,
        found: value.type_name().to_string(),
    }
}

/// Write `text` as a double-quoted string. Quotes, backslashes and the usual control characters
/// are escaped; everything else, single quotes included, is written as is.
pub(crate) fn write_string(out: &mut dyn Sink, text: &str) -> Result<()> {
    out.emit_char('"')?;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        let escaped = match c {
            '"' => "\\\"",
            '\\' => "\\\\",
            '\n' => "\\n",
            '\t' => "\\t",
            '\r' => "\\r",
            '\u{8}' => "\\b",
            '\u{c}' => "\\f",
            _ => continue,
        };
        out.emit(&text[start..i])?;
        out.emit(escaped)?;
        start = i + c.len_utf8();
    }
    out.emit(&text[start..])?;
    out.emit_char('"')
}

/// Incremental writer for `{...}` output shared by the object-shaped transformers.
pub(crate) struct ObjectWriter<'o> {
    out: &'o mut dyn Sink,
    emitted: usize,
}

impl<'o> ObjectWriter<'o> {
    pub(crate) fn begin(out: &'o mut dyn Sink) -> Result<Self> {
        out.emit_char('{')?;
        Ok(ObjectWriter { out, emitted: 0 })
    }

    fn key(&mut self, name: &str) -> Result<()> {
        if self.emitted > 0 {
            self.out.emit_char(',')?;
        }
        write_string(&mut *self.out, name)?;
        self.out.emit_char(':')
    }

    pub(crate) fn member(&mut self, name: &str, value: &dyn Jsonable, cx: &Context<'_>) -> Result<()> {
        self.key(name)?;
        serialize(value, &mut *self.out, cx)?;
        self.emitted += 1;
        Ok(())
    }

    pub(crate) fn member_with(
        &mut self,
        name: &str,
        write: impl FnOnce(&mut dyn Sink) -> Result<()>,
    ) -> Result<()> {
        self.key(name)?;
        write(&mut *self.out)?;
        self.emitted += 1;
        Ok(())
    }

    /// Append the discriminator naming `type_name`.
    pub(crate) fn tag(&mut self, type_name: &str, cx: &Context<'_>) -> Result<()> {
        let key = cx.settings.discriminator_key();
        self.member_with(key, |out| write_string(out, type_name))
    }

    /// Close a described object: the discriminator follows the members unless nothing was
    /// written or the settings exclude it.
    pub(crate) fn finish(mut self, type_name: &str, cx: &Context<'_>) -> Result<()> {
        if self.emitted > 0 && !cx.settings.policy.exclude_discriminator {
            self.tag(type_name, cx)?;
        }
        self.close()
    }

    pub(crate) fn close(self) -> Result<()> {
        self.out.emit_char('}')
    }
}
