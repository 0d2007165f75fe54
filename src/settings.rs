use std::any::TypeId;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use confique::Config as DeriveConfig;
use indexmap::IndexMap;
use tracing::*;

use crate::error::Result;
use crate::jsonable::Jsonable;
use crate::schema::Adapter;
use crate::value::Object;

/// The wire-format knobs. Loadable from a TOML file and `JSONABLE_*` environment variables; the
/// environment wins over the file.
#[derive(Debug, Clone, PartialEq, Eq, DeriveConfig)]
pub struct Policy {
    /// Object key naming the type an object should be read back as.
    #[config(default = "class", env = "JSONABLE_DISCRIMINATOR_KEY")]
    pub discriminator_key: String,

    /// Leave the discriminator out of written objects.
    #[config(default = false, env = "JSONABLE_EXCLUDE_DISCRIMINATOR")]
    pub exclude_discriminator: bool,

    /// Write `null` for described properties without a value instead of leaving them out. Maps
    /// never carry null entries regardless.
    #[config(default = false, env = "JSONABLE_INCLUDE_NULL_FIELDS")]
    pub include_null_fields: bool,

    /// Write primitives as `{"value": v, "<discriminator>": "<type>"}` so their width survives a
    /// round trip.
    #[config(default = false, env = "JSONABLE_INCLUDE_BOXED_PRIMITIVE_CLASS")]
    pub include_boxed_primitive_class: bool,

    /// Write enum constants as `{"name": c, "<discriminator>": "<type>"}`.
    #[config(default = false, env = "JSONABLE_ENUM_AS_CLASS_OBJECT")]
    pub enum_as_class_object: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            discriminator_key: "class".to_string(),
            exclude_discriminator: false,
            include_null_fields: false,
            include_boxed_primitive_class: false,
            enum_as_class_object: false,
        }
    }
}

/// Builds a fresh instance for a discriminator name from the raw mapping, or declines with
/// `None`. The instance is filled from the mapping afterwards.
pub type Factory = dyn Fn(&Object) -> Option<Box<dyn Jsonable>> + Send + Sync;

/// Everything a single read or write consults. Settings are plain values handed to each call;
/// a clone is fully independent of the original.
#[derive(Clone, Default)]
pub struct Settings {
    pub policy: Policy,
    adapters: IndexMap<TypeId, Arc<Adapter>>,
    factories: IndexMap<String, Arc<Factory>>,
}

impl Settings {
    pub fn new(policy: Policy) -> Self {
        Settings {
            policy,
            ..Settings::default()
        }
    }

    /// Load the policy from the environment and, if given, a TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Policy::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        let policy = builder.load()?;
        debug!(?policy, "loaded settings");
        Ok(Settings::new(policy))
    }

    pub fn discriminator_key(&self) -> &str {
        &self.policy.discriminator_key
    }

    /// Register an adapter, replacing any earlier adapter for the same type.
    pub fn register_adapter(&mut self, adapter: Adapter) -> &mut Self {
        self.adapters.insert(adapter.adapted_type(), Arc::new(adapter));
        self
    }

    pub fn adapter(&self, type_id: TypeId) -> Option<&Adapter> {
        self.adapters.get(&type_id).map(Arc::as_ref)
    }

    pub fn adapter_named(&self, name: &str) -> Option<&Adapter> {
        self.adapters
            .values()
            .find(|adapter| adapter.name() == name)
            .map(Arc::as_ref)
    }

    pub fn has_adapters(&self) -> bool {
        !self.adapters.is_empty()
    }

    /// Register an instance factory for a discriminator (or type hint) name, replacing any
    /// earlier factory for it.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Object) -> Option<Box<dyn Jsonable>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub(crate) fn factory(&self, name: &str) -> Option<&Factory> {
        self.factories.get(name).map(Arc::as_ref)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("policy", &self.policy)
            .field(
                "adapters",
                &self.adapters.values().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
