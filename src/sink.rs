//! Where written text goes.

use std::fmt;
use std::io;

use crate::error::{Error, Result};

pub trait Sink {
    fn emit(&mut self, text: &str) -> Result<()>;

    fn emit_char(&mut self, c: char) -> Result<()> {
        self.emit(c.encode_utf8(&mut [0u8; 4]))
    }
}

impl Sink for String {
    fn emit(&mut self, text: &str) -> Result<()> {
        self.push_str(text);
        Ok(())
    }
}

/// A byte sink. Text is written as UTF-8.
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
}

impl<W: io::Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        IoSink { inner }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> Sink for IoSink<W> {
    fn emit(&mut self, text: &str) -> Result<()> {
        self.inner.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// A text sink such as a `fmt::Formatter`.
#[derive(Debug)]
pub struct FmtSink<W> {
    inner: W,
}

impl<W: fmt::Write> FmtSink<W> {
    pub fn new(inner: W) -> Self {
        FmtSink { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: fmt::Write> Sink for FmtSink<W> {
    fn emit(&mut self, text: &str) -> Result<()> {
        self.inner
            .write_str(text)
            .map_err(|_| Error::Io(io::Error::other("text sink rejected the output")))
    }
}
