//! Process-wide caches: one [`TypeDescriptor`] per described type, and the catalog that turns a
//! discriminator name back into a type.
//!
//! Both maps are populated on demand and never invalidated. Concurrent first uses of the same
//! type may both build a descriptor; the first one inserted is kept, and since the build is
//! deterministic either would do.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tracing::*;

use crate::error::Result;
use crate::jsonable::Jsonable;
use crate::materialize::{Context, Materialize};
use crate::schema::{overlay, Described, PropertyDescriptor, Schema, TypeDescriptor};
use crate::settings::Settings;
use crate::value::Object;

static DESCRIPTORS: LazyLock<DashMap<TypeId, Arc<TypeDescriptor>>> = LazyLock::new(DashMap::new);

static CATALOG: LazyLock<DashMap<&'static str, TypeEntry>> = LazyLock::new(|| {
    let catalog = DashMap::new();
    for entry in [
        TypeEntry::of::<bool>(),
        TypeEntry::of::<i8>(),
        TypeEntry::of::<i16>(),
        TypeEntry::of::<i32>(),
        TypeEntry::of::<i64>(),
        TypeEntry::of::<u8>(),
        TypeEntry::of::<u16>(),
        TypeEntry::of::<u32>(),
        TypeEntry::of::<u64>(),
        TypeEntry::of::<f32>(),
        TypeEntry::of::<f64>(),
        TypeEntry::of::<char>(),
    ] {
        catalog.insert(entry.name, entry);
    }
    catalog
});

/// A catalog entry: how to build an instance of a named type from a mapping.
#[derive(Debug, Clone, Copy)]
pub struct TypeEntry {
    pub name: &'static str,
    pub type_id: TypeId,
    materialize: fn(&Object, &Context<'_>) -> Result<Box<dyn Jsonable>>,
}

impl TypeEntry {
    fn of<T: Materialize>() -> Self {
        TypeEntry {
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            materialize: materialize_boxed::<T>,
        }
    }

    pub fn materialize(&self, mapping: &Object, cx: &Context<'_>) -> Result<Box<dyn Jsonable>> {
        (self.materialize)(mapping, cx)
    }
}

fn materialize_boxed<T: Materialize>(
    mapping: &Object,
    cx: &Context<'_>,
) -> Result<Box<dyn Jsonable>> {
    Ok(Box::new(T::materialize(mapping, cx)?))
}

/// Make `T` resolvable by its name. The first type registered under a name keeps it.
pub fn register<T: Materialize>() {
    if CATALOG.contains_key(T::NAME) {
        return;
    }
    CATALOG.entry(T::NAME).or_insert_with(|| {
        debug!(name = T::NAME, "registering type");
        TypeEntry::of::<T>()
    });
}

pub fn lookup(name: &str) -> Option<TypeEntry> {
    CATALOG.get(name).map(|entry| *entry.value())
}

/// The declared descriptor of `T`, built on first use. Building it also registers `T` in the
/// catalog.
pub fn descriptor_of<T: Described>() -> Arc<TypeDescriptor> {
    let type_id = TypeId::of::<T>();
    if let Some(descriptor) = DESCRIPTORS.get(&type_id) {
        return descriptor.value().clone();
    }

    // Built outside of any map guard: describing a type may need its bases' descriptors.
    let mut schema = Schema::<T>::new();
    T::describe(&mut schema);
    let built = Arc::new(schema.build());
    debug!(
        name = T::NAME,
        properties = built.properties().len(),
        levels = built.levels().len(),
        "built type descriptor"
    );

    let descriptor = DESCRIPTORS.entry(type_id).or_insert(built).value().clone();
    register::<T>();
    descriptor
}

/// The properties of `value` for one call: its declared ones, with the properties of any
/// adapter registered in `settings` for one of its levels laid over them. Declared properties
/// win over adapter ones on the same level, and more derived levels win over base levels.
///
/// An empty result means the type is neither described nor adapted.
pub fn properties_of(value: &dyn Jsonable, settings: &Settings) -> Vec<Arc<PropertyDescriptor>> {
    let declared = value.descriptor();
    if !settings.has_adapters() {
        return declared
            .map(|descriptor| descriptor.properties().to_vec())
            .unwrap_or_default();
    }

    let mut merged = Vec::new();
    match declared {
        Some(descriptor) => {
            for level in descriptor.levels() {
                let mut properties = level.properties.clone();
                if let Some(adapter) = settings.adapter(level.type_id) {
                    trace!(level = level.name, "overlaying adapter");
                    overlay(&mut properties, adapter.project(level.projection.as_ref()));
                }
                overlay(&mut merged, properties);
            }
        }
        None => {
            if let Some(adapter) = settings.adapter(value.as_any().type_id()) {
                merged = adapter.project(None);
            }
        }
    }
    merged
}
