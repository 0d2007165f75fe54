use ariadne::{Color, Config as ReportConfig, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::span::Span;
use crate::value::Value;

/// What went wrong while tokenizing. All of these are fatal for the parse they occur in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated object")]
    UnterminatedObject,
    #[error("unterminated array")]
    UnterminatedArray,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("expected `:` after object key")]
    ExpectedColon,
    #[error("expected `,` or `{closer}` but found `{found}`")]
    ExpectedSeparator { closer: char, found: char },
    #[error("unexpected `{found}` after the end of the value")]
    TrailingCharacters { found: char },
    #[error("objects and arrays nested more than {} deep", crate::parser::MAX_DEPTH)]
    TooDeep,
}

impl ParseErrorKind {
    fn label(&self) -> &'static str {
        match self {
            ParseErrorKind::UnterminatedObject => "this `{` is never closed",
            ParseErrorKind::UnterminatedArray => "this `[` is never closed",
            ParseErrorKind::UnterminatedString => "this quote is never closed",
            ParseErrorKind::ExpectedColon => "this key has no value",
            ParseErrorKind::ExpectedSeparator { .. } => "separator expected here",
            ParseErrorKind::TrailingCharacters { .. } => "only whitespace may follow the value",
            ParseErrorKind::TooDeep => "nested too deep here",
        }
    }
}

/// A structural error, spanned in character offsets of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {}..{}", span.lo, span.hi)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }

    /// Render this error as a colourless diagnostic against `src`, which must be the text the
    /// error was produced from. `name` is shown as the source's name.
    pub fn report(&self, name: &str, src: &str) -> String {
        let name = name.to_string();
        let report = Report::build(ReportKind::Error, &name, self.span.lo)
            .with_config(ReportConfig::default().with_color(false))
            .with_message(self.kind.to_string())
            .with_label(
                Label::new((&name, self.span.into_range()))
                    .with_message(self.kind.label())
                    .with_color(Color::Red),
            )
            .finish();

        let mut buf = Vec::new();
        if report
            .write((&name, Source::from(src.to_string())), &mut buf)
            .is_err()
        {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot coerce {found} into `{expected}`{}", at_path(path))]
    Coercion {
        /// Dotted member path from the materialized root, empty at the root itself.
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("accessor for `{member}` failed")]
    Access {
        member: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("no type is registered under `{type_name}`")]
    Unresolved { type_name: String },

    #[error("expected `{expected}` but the input materialized as `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("`{pattern}` is not a usable date pattern")]
    DateFormat { pattern: String },

    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    #[error("failed to load settings")]
    Config(#[from] confique::Error),
}

fn at_path(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at `{path}`")
    }
}

impl Error {
    /// A coercion failure for `raw` at the root; [`Error::at`] adds the member path while the
    /// error travels outwards.
    pub fn coercion(expected: &'static str, raw: &Value) -> Self {
        let found = match raw.scalar_text() {
            Some(text) => format!("{} `{}`", raw.kind_desc(), text),
            None => raw.kind_desc().to_string(),
        };
        Error::Coercion {
            path: String::new(),
            expected,
            found,
        }
    }

    pub fn access(member: &str, source: anyhow::Error) -> Self {
        Error::Access {
            member: member.to_string(),
            source: source.into(),
        }
    }

    /// Prefix the member path of a coercion error with `member`. Other errors pass through.
    pub fn at(self, member: &str) -> Self {
        match self {
            Error::Coercion {
                path,
                expected,
                found,
            } => Error::Coercion {
                path: if path.is_empty() {
                    member.to_string()
                } else if path.starts_with('[') {
                    format!("{member}{path}")
                } else {
                    format!("{member}.{path}")
                },
                expected,
                found,
            },
            other => other,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
