//! A JSON tokenizer, object mapper and serializer.
//!
//! Text is tokenized into a generic [`Value`] tree by [`parser`]. Objects that name a type
//! through the discriminator key (`"class"` by default) are materialized into instances of
//! that type, whose members are declared once through [`Described`] or supplied from the
//! outside by an [`Adapter`]. Writing goes the other way: a fixed set of transformers, picked
//! per runtime type by priority and cached, turns any [`Jsonable`] value back into text.
//!
//! Every read and write takes its [`Settings`] explicitly, so concurrent callers with
//! different policies never observe each other.
//!
//! ```
//! use jsonable::{described, Described, Schema, Settings};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct SimpleObj {
//!     text: String,
//!     num: i32,
//! }
//!
//! described!(SimpleObj);
//!
//! impl Described for SimpleObj {
//!     fn describe(schema: &mut Schema<Self>) {
//!         schema.field("str", |o| &o.text, |o| &mut o.text);
//!         schema.field("num", |o| &o.num, |o| &mut o.num);
//!     }
//! }
//!
//! let settings = Settings::default();
//! let obj: SimpleObj = jsonable::read_as(r#"{"str": "Hello", "num": 1}"#, &settings).unwrap();
//! assert_eq!(obj, SimpleObj { text: "Hello".into(), num: 1 });
//!
//! let text = jsonable::to_string(&obj, &settings).unwrap();
//! assert_eq!(text, r#"{"str":"Hello","num":1,"class":"SimpleObj"}"#);
//! ```

mod macros;

pub mod coerce;
pub mod error;
pub mod groups;
pub mod jsonable;
pub mod materialize;
pub mod parser;
pub mod reader;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod sink;
pub mod span;
pub mod transform;
pub mod value;
pub mod writer;

pub use coerce::Coerce;
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use groups::Groups;
pub use jsonable::{Constant, Jsonable, Kind, Primitive, View};
pub use materialize::{Context, Materialize};
pub use reader::{read, read_as, read_as_grouped, read_from, read_from_as, read_grouped};
pub use registry::register;
pub use schema::{Adapter, DateSpec, Described, PropertyDescriptor, Schema, TypeDescriptor};
pub use settings::{Policy, Settings};
pub use sink::{FmtSink, IoSink, Sink};
pub use span::Span;
pub use value::{Object, Value};
pub use writer::{to_string, to_string_grouped, write, write_fmt, write_to};
