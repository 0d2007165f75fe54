//! Explicit schema registration.
//!
//! A described type lists its members once, in [`Described::describe`], and gets back a
//! [`TypeDescriptor`]: one ordered list of [`PropertyDescriptor`]s per inheritance level plus
//! their merge, where a name declared again by a more derived level shadows the base one.
//! Types that carry no schema of their own can be given one from the outside through an
//! [`Adapter`] registered in the [`crate::Settings`].

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::iter;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::coerce::Coerce;
use crate::error::{Error, Result};
use crate::jsonable::Jsonable;
use crate::materialize::{Context, Materialize};
use crate::registry;
use crate::value::Value;

/// How a date member is written and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpec {
    /// Milliseconds since the Unix epoch, as an integer.
    Timestamp,
    /// A `chrono` format string such as `%Y-%m-%d %H:%M:%S`, written as a string. An empty
    /// pattern stands for RFC 3339.
    Formatted(String),
}

impl DateSpec {
    pub fn formatted(pattern: impl Into<String>) -> Self {
        DateSpec::Formatted(pattern.into())
    }
}

/// A member value produced by a read accessor: borrowed from a field, or owned when it came
/// out of a getter.
pub enum Member<'a> {
    Borrowed(&'a dyn Jsonable),
    Owned(Box<dyn Jsonable>),
}

impl Deref for Member<'_> {
    type Target = dyn Jsonable;

    fn deref(&self) -> &Self::Target {
        match self {
            Member::Borrowed(member) => *member,
            Member::Owned(member) => &**member,
        }
    }
}

trait ReadAccess: Send + Sync {
    fn read<'a>(&self, target: &'a dyn Any) -> Result<Member<'a>>;
}

trait WriteAccess: Send + Sync {
    fn write(&self, target: &mut dyn Any, raw: &Value, cx: &Context<'_>) -> Result<()>;
}

fn target_ref<T: Any>(target: &dyn Any) -> Result<&T> {
    target.downcast_ref::<T>().ok_or_else(foreign_target::<T>)
}

fn target_mut<T: Any>(target: &mut dyn Any) -> Result<&mut T> {
    target.downcast_mut::<T>().ok_or_else(foreign_target::<T>)
}

fn foreign_target<T: Any>() -> Error {
    Error::TypeMismatch {
        expected: std::any::type_name::<T>(),
        found: "a value of another type".to_string(),
    }
}

struct Field<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T: Any, F: Jsonable> ReadAccess for Field<T, F> {
    fn read<'a>(&self, target: &'a dyn Any) -> Result<Member<'a>> {
        Ok(Member::Borrowed((self.get)(target_ref::<T>(target)?)))
    }
}

impl<T: Any, F: Coerce + 'static> WriteAccess for Field<T, F> {
    fn write(&self, target: &mut dyn Any, raw: &Value, cx: &Context<'_>) -> Result<()> {
        let value = F::coerce(raw, cx)?;
        *(self.get_mut)(target_mut::<T>(target)?) = value;
        Ok(())
    }
}

struct Getter<T, F> {
    get: fn(&T) -> F,
}

impl<T: Any, F: Jsonable> ReadAccess for Getter<T, F> {
    fn read<'a>(&self, target: &'a dyn Any) -> Result<Member<'a>> {
        Ok(Member::Owned(Box::new((self.get)(target_ref::<T>(target)?))))
    }
}

struct Setter<T, F> {
    set: fn(&mut T, F),
}

impl<T: Any, F: Coerce + 'static> WriteAccess for Setter<T, F> {
    fn write(&self, target: &mut dyn Any, raw: &Value, cx: &Context<'_>) -> Result<()> {
        let value = F::coerce(raw, cx)?;
        (self.set)(target_mut::<T>(target)?, value);
        Ok(())
    }
}

struct TrySetter<T, F> {
    member: String,
    set: fn(&mut T, F) -> anyhow::Result<()>,
}

impl<T: Any, F: Coerce + 'static> WriteAccess for TrySetter<T, F> {
    fn write(&self, target: &mut dyn Any, raw: &Value, cx: &Context<'_>) -> Result<()> {
        let value = F::coerce(raw, cx)?;
        (self.set)(target_mut::<T>(target)?, value).map_err(|e| Error::access(&self.member, e))
    }
}

/// Maps a most-derived value onto one of its inheritance levels.
pub(crate) trait Projection: Send + Sync {
    fn project<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any>;
    fn project_mut<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

struct Lens<T, B> {
    get: fn(&T) -> &B,
    get_mut: fn(&mut T) -> &mut B,
}

impl<T: Any, B: Any> Projection for Lens<T, B> {
    fn project<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any> {
        let level: &'a dyn Any = (self.get)(target.downcast_ref::<T>()?);
        Some(level)
    }

    fn project_mut<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let level: &'a mut dyn Any = (self.get_mut)(target.downcast_mut::<T>()?);
        Some(level)
    }
}

struct Composed {
    outer: Arc<dyn Projection>,
    inner: Arc<dyn Projection>,
}

impl Projection for Composed {
    fn project<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any> {
        self.inner.project(self.outer.project(target)?)
    }

    fn project_mut<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        self.inner.project_mut(self.outer.project_mut(target)?)
    }
}

struct ProjectedRead {
    lens: Arc<dyn Projection>,
    inner: Arc<dyn ReadAccess>,
}

impl ReadAccess for ProjectedRead {
    fn read<'a>(&self, target: &'a dyn Any) -> Result<Member<'a>> {
        let level = self.lens.project(target).ok_or_else(unreachable_level)?;
        self.inner.read(level)
    }
}

struct ProjectedWrite {
    lens: Arc<dyn Projection>,
    inner: Arc<dyn WriteAccess>,
}

impl WriteAccess for ProjectedWrite {
    fn write(&self, target: &mut dyn Any, raw: &Value, cx: &Context<'_>) -> Result<()> {
        let level = self.lens.project_mut(target).ok_or_else(unreachable_level)?;
        self.inner.write(level, raw, cx)
    }
}

fn unreachable_level() -> Error {
    Error::TypeMismatch {
        expected: "a value of the described type",
        found: "a value of another type".to_string(),
    }
}

/// One serializable member of a type.
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: String,
    groups: BTreeSet<String>,
    date: Option<DateSpec>,
    show_null: bool,
    read: Option<Arc<dyn ReadAccess>>,
    write: Option<Arc<dyn WriteAccess>>,
}

impl PropertyDescriptor {
    fn new(name: &str) -> Self {
        PropertyDescriptor {
            name: name.to_string(),
            groups: BTreeSet::new(),
            date: None,
            show_null: false,
            read: None,
            write: None,
        }
    }

    /// The external (JSON) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn date(&self) -> Option<&DateSpec> {
        self.date.as_ref()
    }

    /// Written as `null` when empty, whatever the null policy says.
    pub fn show_null(&self) -> bool {
        self.show_null
    }

    pub fn can_read(&self) -> bool {
        self.read.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.write.is_some()
    }

    /// Read this member out of `target`; `None` for write-only members.
    pub fn read<'a>(&self, target: &'a dyn Any) -> Result<Option<Member<'a>>> {
        self.read.as_ref().map(|read| read.read(target)).transpose()
    }

    /// Coerce `raw` to the member's type and store it into `target`. Read-only members ignore
    /// the call.
    pub fn write(&self, target: &mut dyn Any, raw: &Value, cx: &Context<'_>) -> Result<()> {
        match &self.write {
            Some(write) => write.write(target, raw, cx),
            None => Ok(()),
        }
    }

    fn projected(&self, lens: &Arc<dyn Projection>) -> PropertyDescriptor {
        PropertyDescriptor {
            read: self.read.clone().map(|inner| {
                Arc::new(ProjectedRead {
                    lens: lens.clone(),
                    inner,
                }) as Arc<dyn ReadAccess>
            }),
            write: self.write.clone().map(|inner| {
                Arc::new(ProjectedWrite {
                    lens: lens.clone(),
                    inner,
                }) as Arc<dyn WriteAccess>
            }),
            ..self.clone()
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("groups", &self.groups)
            .field("date", &self.date)
            .field("show_null", &self.show_null)
            .field("can_read", &self.can_read())
            .field("can_write", &self.can_write())
            .finish()
    }
}

pub(crate) struct Level {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) properties: Vec<Arc<PropertyDescriptor>>,
    /// From the most-derived type to this level; `None` on the most-derived level itself.
    pub(crate) projection: Option<Arc<dyn Projection>>,
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct TypeDescriptor {
    type_id: TypeId,
    name: &'static str,
    /// Most-derived level first.
    levels: Vec<Level>,
    properties: Vec<Arc<PropertyDescriptor>>,
}

impl TypeDescriptor {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The merged properties: the most-derived level's first, in declaration order, then each
    /// base level's properties that were not shadowed.
    pub fn properties(&self) -> &[Arc<PropertyDescriptor>] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(Arc::as_ref)
    }

    pub(crate) fn levels(&self) -> &[Level] {
        &self.levels
    }
}

/// Append the properties of a less derived level that no earlier level declared.
pub(crate) fn overlay(
    merged: &mut Vec<Arc<PropertyDescriptor>>,
    level: impl IntoIterator<Item = Arc<PropertyDescriptor>>,
) {
    for property in level {
        if !merged.iter().any(|p| p.name == property.name) {
            merged.push(property);
        }
    }
}

/// Types with a declared schema.
///
/// ```
/// use jsonable::{described, Described, Schema};
///
/// #[derive(Debug, Clone, Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// described!(Point);
///
/// impl Described for Point {
///     fn describe(schema: &mut Schema<Self>) {
///         schema.field("x", |p| &p.x, |p| &mut p.x);
///         schema.field("y", |p| &p.y, |p| &mut p.y);
///     }
/// }
/// ```
pub trait Described: Materialize + Default + Clone {
    fn describe(schema: &mut Schema<Self>);
}

/// The declarations for one type, collected by [`Described::describe`] or [`Adapter::new`].
///
/// Accessors sharing an external name on the same level are merged into one property, so a
/// getter and a setter (or a field and a setter) declared under one name read and write the
/// same member.
pub struct Schema<T> {
    properties: Vec<PropertyDescriptor>,
    bases: Vec<Level>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Materialize> Schema<T> {
    pub(crate) fn new() -> Self {
        Schema {
            properties: Vec::new(),
            bases: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn slot(&mut self, name: &str) -> &mut PropertyDescriptor {
        let index = match self.properties.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.properties.push(PropertyDescriptor::new(name));
                self.properties.len() - 1
            }
        };
        &mut self.properties[index]
    }

    /// A readable and writable member stored in a field.
    pub fn field<F>(
        &mut self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> PropertyBuilder<'_>
    where
        F: Jsonable + Coerce,
    {
        let property = self.slot(name);
        property.read = Some(Arc::new(Field { get, get_mut }));
        property.write = Some(Arc::new(Field { get, get_mut }));
        PropertyBuilder { property }
    }

    /// A computed member.
    pub fn getter<F: Jsonable>(&mut self, name: &str, get: fn(&T) -> F) -> PropertyBuilder<'_> {
        let property = self.slot(name);
        property.read = Some(Arc::new(Getter { get }));
        PropertyBuilder { property }
    }

    pub fn setter<F: Coerce + 'static>(
        &mut self,
        name: &str,
        set: fn(&mut T, F),
    ) -> PropertyBuilder<'_> {
        let property = self.slot(name);
        property.write = Some(Arc::new(Setter { set }));
        PropertyBuilder { property }
    }

    /// A setter that may reject the value. A rejection aborts the read with
    /// [`Error::Access`].
    pub fn try_setter<F: Coerce + 'static>(
        &mut self,
        name: &str,
        set: fn(&mut T, F) -> anyhow::Result<()>,
    ) -> PropertyBuilder<'_> {
        let property = self.slot(name);
        property.write = Some(Arc::new(TrySetter {
            member: name.to_string(),
            set,
        }));
        PropertyBuilder { property }
    }

    /// Inherit the levels of `B`, which `T` embeds. Properties declared on `T` shadow those of
    /// `B` with the same name.
    pub fn extends<B: Described>(
        &mut self,
        get: fn(&T) -> &B,
        get_mut: fn(&mut T) -> &mut B,
    ) -> &mut Self {
        let base = registry::descriptor_of::<B>();
        let lens: Arc<dyn Projection> = Arc::new(Lens { get, get_mut });
        for level in base.levels() {
            let projection: Arc<dyn Projection> = match &level.projection {
                None => lens.clone(),
                Some(inner) => Arc::new(Composed {
                    outer: lens.clone(),
                    inner: inner.clone(),
                }),
            };
            self.bases.push(Level {
                type_id: level.type_id,
                name: level.name,
                properties: level
                    .properties
                    .iter()
                    .map(|p| Arc::new(p.projected(&lens)))
                    .collect(),
                projection: Some(projection),
            });
        }
        self
    }

    pub(crate) fn build(self) -> TypeDescriptor {
        let own = Level {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
            properties: self.properties.into_iter().map(Arc::new).collect(),
            projection: None,
        };
        let levels: Vec<Level> = iter::once(own).chain(self.bases).collect();

        let mut properties = Vec::new();
        for level in &levels {
            overlay(&mut properties, level.properties.iter().cloned());
        }

        TypeDescriptor {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
            levels,
            properties,
        }
    }
}

pub struct PropertyBuilder<'s> {
    property: &'s mut PropertyDescriptor,
}

impl PropertyBuilder<'_> {
    pub fn groups<I, S>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.property.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn date(self, spec: DateSpec) -> Self {
        self.property.date = Some(spec);
        self
    }

    pub fn show_null(self) -> Self {
        self.property.show_null = true;
        self
    }
}

/// Properties for a type supplied from the outside. Writing uses them in place of (or, for
/// described types, on top of) the type's own schema; reading creates `T::default()` and fills
/// it through them.
pub struct Adapter {
    adapted: TypeId,
    name: &'static str,
    properties: Vec<Arc<PropertyDescriptor>>,
    create: fn() -> Box<dyn Jsonable>,
}

impl Adapter {
    pub fn new<T>(describe: impl FnOnce(&mut Schema<T>)) -> Self
    where
        T: Materialize + Default,
    {
        let mut schema = Schema::<T>::new();
        describe(&mut schema);
        let descriptor = schema.build();
        Adapter {
            adapted: TypeId::of::<T>(),
            name: T::NAME,
            properties: descriptor.properties,
            create: create_default::<T>,
        }
    }

    pub fn adapted_type(&self) -> TypeId {
        self.adapted
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn properties(&self) -> &[Arc<PropertyDescriptor>] {
        &self.properties
    }

    pub(crate) fn project(&self, lens: Option<&Arc<dyn Projection>>) -> Vec<Arc<PropertyDescriptor>> {
        match lens {
            None => self.properties.clone(),
            Some(lens) => self
                .properties
                .iter()
                .map(|p| Arc::new(p.projected(lens)))
                .collect(),
        }
    }

    pub(crate) fn create(&self) -> Box<dyn Jsonable> {
        (self.create)()
    }
}

fn create_default<T: Jsonable + Default>() -> Box<dyn Jsonable> {
    Box::new(T::default())
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}
