//! Writing JSON text.

use std::fmt;
use std::io::{self, BufWriter};

use tracing::*;

use crate::error::Result;
use crate::groups::Groups;
use crate::jsonable::Jsonable;
use crate::materialize::Context;
use crate::settings::Settings;
use crate::sink::{FmtSink, IoSink, Sink};
use crate::transform::serialize;

/// Write `value` to `out`, including only the properties admitted by `groups`.
#[instrument(level = "trace", skip_all, fields(type_name = value.type_name()))]
pub fn write(
    value: &dyn Jsonable,
    out: &mut dyn Sink,
    settings: &Settings,
    groups: &Groups,
) -> Result<()> {
    serialize(value, out, &Context::new(settings, groups))
}

pub fn to_string(value: &dyn Jsonable, settings: &Settings) -> Result<String> {
    to_string_grouped(value, settings, &Groups::none())
}

pub fn to_string_grouped(value: &dyn Jsonable, settings: &Settings, groups: &Groups) -> Result<String> {
    let mut out = String::new();
    write(value, &mut out, settings, groups)?;
    Ok(out)
}

/// Write `value` as UTF-8 to a byte sink. The output is buffered and flushed before returning.
pub fn write_to<W: io::Write>(value: &dyn Jsonable, writer: W, settings: &Settings) -> Result<()> {
    let mut out = IoSink::new(BufWriter::new(writer));
    write(value, &mut out, settings, &Groups::none())?;
    out.flush()
}

/// Write `value` to a text sink.
pub fn write_fmt<W: fmt::Write>(value: &dyn Jsonable, writer: W, settings: &Settings) -> Result<W> {
    let mut out = FmtSink::new(writer);
    write(value, &mut out, settings, &Groups::none())?;
    Ok(out.into_inner())
}
