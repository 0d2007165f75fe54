use std::fmt::Write;

use super::{mismatch, write_string, Probe, Transformer};
use crate::error::{Error, Result};
use crate::jsonable::{Jsonable, Kind, View};
use crate::materialize::Context;
use crate::schema::DateSpec;
use crate::sink::Sink;

/// Dates follow the date spec of the member being written. Without one they are written as
/// epoch milliseconds.
pub(super) struct DateTransformer;

impl Transformer for DateTransformer {
    fn name(&self) -> &'static str {
        "date"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn matches(&self, probe: &Probe) -> bool {
        probe.kind == Kind::Date
    }

    fn write(&self, value: &dyn Jsonable, out: &mut dyn Sink, cx: &Context<'_>) -> Result<()> {
        let View::Date(date) = value.view() else {
            return Err(mismatch("date", value));
        };
        match cx.date {
            Some(DateSpec::Formatted(pattern)) if pattern.is_empty() => {
                write_string(out, &date.to_rfc3339())
            }
            Some(DateSpec::Formatted(pattern)) => {
                let mut text = String::new();
                // chrono reports a bad pattern only as a formatting failure.
                write!(text, "{}", date.format(pattern)).map_err(|_| Error::DateFormat {
                    pattern: pattern.clone(),
                })?;
                write_string(out, &text)
            }
            Some(DateSpec::Timestamp) | None => out.emit(&date.timestamp_millis().to_string()),
        }
    }
}
