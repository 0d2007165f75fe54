//! The runtime view the writer and the materializer take of a value.
//!
//! Every value that can be written implements [`Jsonable`]. The trait reports which category
//! the value falls in ([`Kind`]) for transformer dispatch, exposes its contents ([`View`]), and
//! gives type-erased access for the accessors in [`crate::schema`].

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::Result;
use crate::materialize::Context;
use crate::schema::TypeDescriptor;
use crate::value::{Object, Value};

/// The category a value is written as. Together with the type name and the schema/adapter
/// flags it forms the dispatch key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Primitive,
    Str,
    Enum,
    Date,
    Sequence,
    Map,
    Object,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    F32(f32),
    F64(f64),
    Char(char),
}

/// The contents of a value, borrowed for the duration of a write.
#[derive(Debug)]
pub enum View<'a> {
    Null,
    Primitive(Primitive),
    Str(&'a str),
    /// An enum constant, by name.
    Enum(&'static str),
    Date(DateTime<Utc>),
    Sequence(Vec<&'a dyn Jsonable>),
    Map(Vec<(&'a str, &'a dyn Jsonable)>),
    /// Members are found through the type's descriptor, an adapter, or [`Jsonable::fields`].
    Object,
}

pub trait Jsonable: Any + Debug + Send + Sync + 'static {
    /// The name written as the discriminator and looked up in the type catalog.
    fn type_name(&self) -> &'static str;

    fn kind(&self) -> Kind;

    fn view(&self) -> View<'_>;

    /// The declared schema, for described types.
    fn descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        None
    }

    /// Plain member listing used when a type has neither a schema nor an adapter.
    fn fields(&self) -> Vec<(&'static str, &dyn Jsonable)> {
        Vec::new()
    }

    /// Counterpart of [`Jsonable::fields`] on the read path.
    fn fill_members(&mut self, _mapping: &Object, _cx: &Context<'_>) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn clone_boxed(&self) -> Box<dyn Jsonable>;
}

/// Enums written by the name of their constant.
pub trait Constant: Sized {
    fn constant_name(&self) -> &'static str;

    fn from_constant(name: &str) -> Option<Self>;
}

impl dyn Jsonable {
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    pub fn downcast<T: Any>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast::<T>().ok().map(|b| *b)
    }
}

impl Clone for Box<dyn Jsonable> {
    fn clone(&self) -> Self {
        (**self).clone_boxed()
    }
}

macro_rules! primitive {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl Jsonable for $ty {
                fn type_name(&self) -> &'static str {
                    stringify!($ty)
                }

                fn kind(&self) -> Kind {
                    Kind::Primitive
                }

                fn view(&self) -> View<'_> {
                    View::Primitive(Primitive::$variant(<$conv>::from(*self)))
                }

                crate::__any_plumbing!();
            }
        )*
    };
}

primitive! {
    bool => Bool as bool,
    i8 => Signed as i64,
    i16 => Signed as i64,
    i32 => Signed as i64,
    i64 => Signed as i64,
    u8 => Unsigned as u64,
    u16 => Unsigned as u64,
    u32 => Unsigned as u64,
    u64 => Unsigned as u64,
    f32 => F32 as f32,
    f64 => F64 as f64,
    char => Char as char,
}

impl Jsonable for String {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn kind(&self) -> Kind {
        Kind::Str
    }

    fn view(&self) -> View<'_> {
        View::Str(self)
    }

    crate::__any_plumbing!();
}

impl Jsonable for DateTime<Utc> {
    fn type_name(&self) -> &'static str {
        "date"
    }

    fn kind(&self) -> Kind {
        Kind::Date
    }

    fn view(&self) -> View<'_> {
        View::Date(*self)
    }

    crate::__any_plumbing!();
}

impl<T: Jsonable + Clone> Jsonable for Option<T> {
    fn type_name(&self) -> &'static str {
        match self {
            Some(inner) => inner.type_name(),
            None => "null",
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Some(inner) => inner.kind(),
            None => Kind::Null,
        }
    }

    fn view(&self) -> View<'_> {
        match self {
            Some(inner) => inner.view(),
            None => View::Null,
        }
    }

    fn descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        self.as_ref().and_then(Jsonable::descriptor)
    }

    fn fields(&self) -> Vec<(&'static str, &dyn Jsonable)> {
        self.as_ref().map(Jsonable::fields).unwrap_or_default()
    }

    fn fill_members(&mut self, mapping: &Object, cx: &Context<'_>) -> Result<()> {
        match self {
            Some(inner) => inner.fill_members(mapping, cx),
            None => Ok(()),
        }
    }

    // A present value is seen as the value itself, so accessors declared for `T` apply.
    fn as_any(&self) -> &dyn Any {
        match self {
            Some(inner) => inner.as_any(),
            None => self,
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        match self {
            Some(inner) => inner.as_any_mut(),
            None => self,
        }
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        match *self {
            Some(inner) => Box::new(inner).into_any(),
            None => self,
        }
    }

    fn clone_boxed(&self) -> Box<dyn Jsonable> {
        Box::new(self.clone())
    }
}

/// A type-erased member. Its type name, kind and `Any` identity are those of the value inside.
impl Jsonable for Box<dyn Jsonable> {
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn kind(&self) -> Kind {
        (**self).kind()
    }

    fn view(&self) -> View<'_> {
        (**self).view()
    }

    fn descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        (**self).descriptor()
    }

    fn fields(&self) -> Vec<(&'static str, &dyn Jsonable)> {
        (**self).fields()
    }

    fn fill_members(&mut self, mapping: &Object, cx: &Context<'_>) -> Result<()> {
        (**self).fill_members(mapping, cx)
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        (*self).into_any()
    }

    fn clone_boxed(&self) -> Box<dyn Jsonable> {
        (**self).clone_boxed()
    }
}

macro_rules! sequence {
    ($($ty:ident<T $(: $bound:ident $(+ $more:ident)*)?>),* $(,)?) => {
        $(
            impl<T: Jsonable + Clone $(+ $bound $(+ $more)*)?> Jsonable for $ty<T> {
                fn type_name(&self) -> &'static str {
                    std::any::type_name::<Self>()
                }

                fn kind(&self) -> Kind {
                    Kind::Sequence
                }

                fn view(&self) -> View<'_> {
                    View::Sequence(self.iter().map(|e| e as &dyn Jsonable).collect())
                }

                crate::__any_plumbing!();
            }
        )*
    };
}

sequence! {
    Vec<T>,
    VecDeque<T>,
    HashSet<T: Eq + Hash>,
    BTreeSet<T: Ord>,
}

impl<T: Jsonable + Clone, const N: usize> Jsonable for [T; N] {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn view(&self) -> View<'_> {
        View::Sequence(self.iter().map(|e| e as &dyn Jsonable).collect())
    }

    crate::__any_plumbing!();
}

macro_rules! map {
    ($($ty:ident),* $(,)?) => {
        $(
            impl<V: Jsonable + Clone> Jsonable for $ty<String, V> {
                fn type_name(&self) -> &'static str {
                    std::any::type_name::<Self>()
                }

                fn kind(&self) -> Kind {
                    Kind::Map
                }

                fn view(&self) -> View<'_> {
                    View::Map(
                        self.iter()
                            .map(|(k, v)| (k.as_str(), v as &dyn Jsonable))
                            .collect(),
                    )
                }

                crate::__any_plumbing!();
            }
        )*
    };
}

map!(HashMap, BTreeMap, IndexMap);

/// Generic trees are written by their shape: objects as maps, arrays as sequences.
impl Jsonable for Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Integer(_) => "i64",
            Value::Float(_) => "f64",
            other => other.kind_desc(),
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) => Kind::Primitive,
            Value::String(_) => Kind::Str,
            Value::Array(_) => Kind::Sequence,
            Value::Object(_) => Kind::Map,
        }
    }

    fn view(&self) -> View<'_> {
        match self {
            Value::Null => View::Null,
            Value::Bool(b) => View::Primitive(Primitive::Bool(*b)),
            Value::Integer(i) => View::Primitive(Primitive::Signed(*i)),
            Value::Float(f) => View::Primitive(Primitive::F64(*f)),
            Value::String(s) => View::Str(s),
            Value::Array(items) => View::Sequence(items.iter().map(|e| e as &dyn Jsonable).collect()),
            Value::Object(members) => View::Map(
                members
                    .iter()
                    .map(|(k, v)| (k.as_str(), v as &dyn Jsonable))
                    .collect(),
            ),
        }
    }

    crate::__any_plumbing!();
}
