//! Character-level recursive-descent tokenizer for the JSON dialect read by this crate.
//!
//! The dialect is deliberately lenient: strings may be single- or double-quoted, object keys
//! may be bare, bare tokens that are neither numbers, booleans nor `null` are kept as strings,
//! and an empty value slot (`[1,,2]`, `{"a":}`) reads as `null`. Integers beyond the `i64`
//! range are kept as strings holding their digits. `\uXXXX` escapes are not
//! recognized: like every other unknown escape, the escaped character is dropped.
//!
//! The tokenizer only builds the generic [`Value`] tree. Turning a tree into typed instances is
//! the job of [`crate::materialize`].

use std::iter::Peekable;
use std::str::Chars;

use tracing::*;

use crate::error::{ParseError, ParseErrorKind};
use crate::span::Span;
use crate::value::{Object, Value};

const START_MAP: char = '{';
const END_MAP: char = '}';
const START_ARRAY: char = '[';
const END_ARRAY: char = ']';
const ESCAPE_CHAR: char = '\\';
const STRING_CHAR: char = '"';
const CHAR_CHAR: char = '\'';
const ELEM_DELIM: char = ',';
const VALUE_DELIM: char = ':';

/// How many objects and arrays may enclose one another.
pub const MAX_DEPTH: usize = 256;

/// Parse exactly one value from `src`. Only whitespace may follow it; an empty (or
/// whitespace-only) source reads as [`Value::Null`].
pub fn parse(src: &str) -> Result<Value, ParseError> {
    Parser::new(src).parse_document()
}

pub struct Parser<I: Iterator<Item = char>> {
    chars: Peekable<I>,
    /// Offset, in characters, of the next character to be consumed.
    offset: usize,
    /// Objects and arrays currently open.
    depth: usize,
}

impl<'s> Parser<Chars<'s>> {
    pub fn new(src: &'s str) -> Self {
        Parser::from_chars(src.chars())
    }
}

impl<I: Iterator<Item = char>> Parser<I> {
    pub fn from_chars(chars: I) -> Self {
        Parser {
            chars: chars.peekable(),
            offset: 0,
            depth: 0,
        }
    }

    /// Parse one value and require that nothing but whitespace follows it.
    pub fn parse_document(mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Ok(Value::Null);
        }

        let value = self.parse_value()?;

        self.skip_whitespace();
        if let Some(found) = self.peek() {
            return Err(ParseError::new(
                ParseErrorKind::TrailingCharacters { found },
                self.here(),
            ));
        }
        Ok(value)
    }

    /// Parse the value starting at the next non-whitespace character.
    pub fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(START_MAP) => self.nested(Self::parse_object),
            Some(START_ARRAY) => self.nested(Self::parse_array),
            Some(quote @ (STRING_CHAR | CHAR_CHAR)) => self.parse_string(quote).map(Value::String),
            _ => Ok(self.parse_literal()),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, ParseError>,
    ) -> Result<Value, ParseError> {
        if self.depth == MAX_DEPTH {
            return Err(ParseError::new(ParseErrorKind::TooDeep, self.here()));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_object(&mut self) -> Result<Value, ParseError> {
        let open = self.offset;
        self.bump();
        let unterminated = || ParseError::new(ParseErrorKind::UnterminatedObject, Span::new(open, open + 1));

        let mut object = Object::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(unterminated()),
                Some(END_MAP) => {
                    self.bump();
                    return Ok(Value::Object(object));
                }
                // Stray and trailing commas are tolerated.
                Some(ELEM_DELIM) => {
                    self.bump();
                    continue;
                }
                Some(_) => {}
            }

            let key = self.parse_key(open)?;
            let value = self.parse_value()?;
            trace!(%key, kind = value.kind_desc(), "object member");
            object.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                None => return Err(unterminated()),
                Some(ELEM_DELIM) => {
                    self.bump();
                }
                Some(END_MAP) => {
                    self.bump();
                    return Ok(Value::Object(object));
                }
                Some(found) => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedSeparator {
                            closer: END_MAP,
                            found,
                        },
                        self.here(),
                    ))
                }
            }
        }
    }

    /// Read an object key up to and including its `:`. Quoted keys are unescaped, bare keys are
    /// trimmed.
    fn parse_key(&mut self, open: usize) -> Result<String, ParseError> {
        let unterminated = || ParseError::new(ParseErrorKind::UnterminatedObject, Span::new(open, open + 1));

        if let Some(quote @ (STRING_CHAR | CHAR_CHAR)) = self.peek() {
            let key = self.parse_string(quote)?;
            self.skip_whitespace();
            return match self.peek() {
                None => Err(unterminated()),
                Some(VALUE_DELIM) => {
                    self.bump();
                    Ok(key)
                }
                Some(_) => Err(ParseError::new(ParseErrorKind::ExpectedColon, self.here())),
            };
        }

        let start = self.offset;
        let mut key = String::new();
        loop {
            match self.peek() {
                None => return Err(unterminated()),
                Some(VALUE_DELIM) => {
                    self.bump();
                    return Ok(key.trim().to_string());
                }
                Some(ELEM_DELIM | END_MAP) => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedColon,
                        Span::new(start, self.offset),
                    ))
                }
                Some(c) => {
                    key.push(c);
                    self.bump();
                }
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        let open = self.offset;
        self.bump();
        let unterminated = || ParseError::new(ParseErrorKind::UnterminatedArray, Span::new(open, open + 1));

        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(unterminated()),
                Some(END_ARRAY) => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(_) => {}
            }

            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                None => return Err(unterminated()),
                Some(ELEM_DELIM) => {
                    self.bump();
                }
                Some(END_ARRAY) => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(found) => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedSeparator {
                            closer: END_ARRAY,
                            found,
                        },
                        self.here(),
                    ))
                }
            }
        }
    }

    /// Read a string literal opened by `quote`. Only the same quote character closes it.
    fn parse_string(&mut self, quote: char) -> Result<String, ParseError> {
        let open = self.offset;
        self.bump();
        let unterminated = || ParseError::new(ParseErrorKind::UnterminatedString, Span::new(open, open + 1));

        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(unterminated()),
                Some(c) if c == quote => return Ok(s),
                Some(ESCAPE_CHAR) => match self.bump() {
                    None => return Err(unterminated()),
                    Some(escaped) => match unescape(escaped) {
                        Some(c) => s.push(c),
                        None => trace!(%escaped, at = self.offset - 1, "dropping unknown escape"),
                    },
                },
                Some(c) => s.push(c),
            }
        }
    }

    /// Scan a bare token up to the next structural delimiter (or the end of input) and classify
    /// it.
    fn parse_literal(&mut self) -> Value {
        let mut token = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, ELEM_DELIM | END_MAP | END_ARRAY | VALUE_DELIM) {
                break;
            }
            token.push(c);
            self.bump();
        }
        classify(token.trim())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.bump();
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += 1;
        Some(c)
    }

    fn here(&self) -> Span {
        Span::new(self.offset, self.offset + 1)
    }
}

fn unescape(escaped: char) -> Option<char> {
    match escaped {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        '\\' | '"' | '\'' | '/' => Some(escaped),
        _ => None,
    }
}

/// Classify a trimmed bare token.
fn classify(token: &str) -> Value {
    if token.is_empty() || token.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if token.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    let unsigned = token.strip_prefix(['-', '+']).unwrap_or(token);
    let digits = unsigned.chars().filter(char::is_ascii_digit).count();
    let dots = unsigned.chars().filter(|c| *c == '.').count();

    if digits > 0 && digits == unsigned.len() {
        // Integers too wide for `i64` keep their exact text; numeric coercions parse it.
        return match token.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::String(token.to_string()),
        };
    }
    if digits > 0 && dots == 1 && digits + dots == unsigned.len() {
        if let Ok(f) = token.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(members: &[(&str, Value)]) -> Value {
        Value::Object(
            members
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse("1").unwrap(), Value::Integer(1));
        assert_eq!(parse("  -42 ").unwrap(), Value::Integer(-42));
        assert_eq!(parse("+7").unwrap(), Value::Integer(7));
        assert_eq!(parse("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(parse("-0.25").unwrap(), Value::Float(-0.25));
        assert_eq!(parse("TRUE").unwrap(), Value::Bool(true));
        assert_eq!(parse("False").unwrap(), Value::Bool(false));
        assert_eq!(parse("null").unwrap(), Value::Null);
        assert_eq!(parse("").unwrap(), Value::Null);
        assert_eq!(parse("1.2.3").unwrap(), Value::String("1.2.3".into()));
        assert_eq!(parse("hello world").unwrap(), Value::String("hello world".into()));
        assert_eq!(
            parse("123456789012345678901234567890").unwrap(),
            Value::String("123456789012345678901234567890".into())
        );
        assert_eq!(
            parse("18446744073709551615").unwrap(),
            Value::String("18446744073709551615".into())
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(parse(r#""Hel\"lo""#).unwrap(), Value::from("Hel\"lo"));
        assert_eq!(parse(r#""Hel'lo""#).unwrap(), Value::from("Hel'lo"));
        assert_eq!(parse(r#"'say "hi"'"#).unwrap(), Value::from("say \"hi\""));
        assert_eq!(parse(r#"'it\'s'"#).unwrap(), Value::from("it's"));
        assert_eq!(parse(r#""a\\b\nc\td""#).unwrap(), Value::from("a\\b\nc\td"));
        assert_eq!(parse(r#""x\qy""#).unwrap(), Value::from("xy"));
        // No unicode escapes: the `u` is dropped, the digits stay.
        assert_eq!(parse(r#""\u0041""#).unwrap(), Value::from("0041"));
        assert_eq!(parse("\"שלום\"").unwrap(), Value::from("שלום"));
        assert_eq!(parse("\"  padded  \"").unwrap(), Value::from("  padded  "));
    }

    #[test]
    fn test_whitespace_heavy_map() {
        let src = "{\"key1\":  \"hello\", \"key2\"  \n :    {\"key3\"    : \t   5  , \"key4\": [\t\t\"dt\", \"st\", [34, 56]   ]   }     }";
        let v = parse(src).unwrap();
        assert_eq!(v.get("key1"), Some(&Value::from("hello")));
        let inner = v.get("key2").unwrap();
        assert_eq!(inner.get("key3"), Some(&Value::Integer(5)));
        let list = inner.get("key4").and_then(Value::as_array).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[2], Value::from(vec![34, 56]));
    }

    #[test]
    fn test_crlf_and_bare_keys() {
        let v = parse("{\r\n success : true,\r\n 'msg' : \"Hello\"\r\n}").unwrap();
        assert_eq!(
            v,
            obj(&[("success", Value::Bool(true)), ("msg", Value::from("Hello"))])
        );
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let v = parse(r#"{"a": 1, "b": 2, "a": 3}"#).unwrap();
        assert_eq!(v.get("a"), Some(&Value::Integer(3)));
        assert_eq!(v.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_slots_and_trailing_commas() {
        assert_eq!(parse("[]").unwrap(), Value::Array(vec![]));
        assert_eq!(parse("{ }").unwrap(), obj(&[]));
        assert_eq!(
            parse("[1,,2,]").unwrap(),
            Value::Array(vec![Value::Integer(1), Value::Null, Value::Integer(2)])
        );
        assert_eq!(parse(r#"{"a":,}"#).unwrap(), obj(&[("a", Value::Null)]));
    }

    #[test]
    fn test_structural_errors() {
        let err = parse(r#"{"a": [1, 2"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedArray);
        assert_eq!(err.span, Span::new(6, 7));

        let err = parse(r#"{"a": 1"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedObject);
        assert_eq!(err.span, Span::new(0, 1));

        let err = parse(r#""abc"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedString);

        let err = parse(r#"{"a" 1}"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedColon);

        let err = parse(r#"["a" "b"]"#).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::ExpectedSeparator {
                closer: ']',
                found: '"'
            }
        );

        let err = parse("[1] [2]").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TrailingCharacters { found: '[' });
        assert_eq!(err.span, Span::new(4, 5));
    }

    #[test]
    fn test_spans_count_characters_not_bytes() {
        let err = parse("[\"ש\", 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedArray);
        let err = parse("[\"שלום\" x]").unwrap_err();
        assert_eq!(err.span, Span::new(8, 9));
    }

    #[test]
    fn test_nesting_is_bounded() {
        let deepest = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&deepest).is_ok());

        let err = parse(&"[".repeat(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep);
        assert_eq!(err.span, Span::new(MAX_DEPTH, MAX_DEPTH + 1));

        let err = parse(&"{\"a\":".repeat(100_000)).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep);
    }

    fn from_reference(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(from_reference).collect()),
            serde_json::Value::Object(o) => {
                Value::Object(o.into_iter().map(|(k, v)| (k, from_reference(v))).collect())
            }
        }
    }

    #[test]
    fn test_agrees_with_reference_parser_on_plain_documents() {
        let documents = [
            r#"{"name": "widget", "tags": ["a", "b"], "price": 12.5, "stock": 3, "active": true, "note": null}"#,
            r#"[{"x": 1}, {"x": -2, "y": [true, false, null]}, [], {}]"#,
            r#"{"nested": {"deeper": {"deepest": [1, 2.25, "three"]}}}"#,
            r#""line\nbreak \"quoted\" back\\slash""#,
            "  [ 1 ,\t2 ,\n3 ]  ",
        ];
        for doc in documents {
            let reference: serde_json::Value = serde_json::from_str(doc).unwrap();
            assert_eq!(parse(doc).unwrap(), from_reference(reference), "{doc}");
        }
    }
}
