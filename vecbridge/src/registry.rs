//! Provider Registry
//!
//! `TigerStyle`: Name-keyed construction, fail fast on unknown names.
//!
//! A [`ProviderRegistry`] maps a provider name to a constructor that builds
//! the provider from a JSON config bundle. Registration happens on an owned
//! registry; the process-wide one is frozen once first read.
//!
//! ```rust,ignore
//! let provider = vecbridge::registry::global()
//!     .create("memory", serde_json::json!({}))
//!     .await?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{MemoryProvider, VectorProvider};

#[cfg(feature = "postgres")]
use crate::provider::PgVectorProvider;
#[cfg(feature = "pinecone")]
use crate::provider::PineconeProvider;

/// Builds an un-setup provider from its config bundle.
pub type ProviderConstructor =
    Arc<dyn Fn(Value) -> ProviderResult<Arc<dyn VectorProvider>> + Send + Sync>;

/// Name to constructor table.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: BTreeMap<String, ProviderConstructor>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every provider compiled into this build.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("memory", |value| {
            Ok(Arc::new(MemoryProvider::from_value(value)?) as Arc<dyn VectorProvider>)
        });

        #[cfg(feature = "pinecone")]
        registry.register("pinecone", |value| {
            Ok(Arc::new(PineconeProvider::from_value(value)?) as Arc<dyn VectorProvider>)
        });

        #[cfg(feature = "postgres")]
        registry.register("pgvector", |value| {
            Ok(Arc::new(PgVectorProvider::from_value(value)?) as Arc<dyn VectorProvider>)
        });

        registry
    }

    /// Add or replace a constructor under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(Value) -> ProviderResult<Arc<dyn VectorProvider>> + Send + Sync + 'static,
    {
        let name = name.into();
        assert!(!name.is_empty(), "provider name must not be empty");

        if self
            .constructors
            .insert(name.clone(), Arc::new(constructor))
            .is_some()
        {
            tracing::debug!(provider = %name, "replaced provider constructor");
        }
        self
    }

    /// True if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build `name` from `config` without calling `setup()`.
    ///
    /// # Errors
    /// Returns `Configuration` for an unknown name or a rejected config.
    pub fn build(&self, name: &str, config: Value) -> ProviderResult<Arc<dyn VectorProvider>> {
        let constructor = self.constructors.get(name).ok_or_else(|| {
            ProviderError::configuration(format!(
                "unknown vector provider '{name}'; available providers: [{}]",
                self.names().join(", ")
            ))
        })?;
        let provider = constructor(config)?;
        if provider.name() != name {
            tracing::debug!(
                registered = name,
                provider = provider.name(),
                "provider registered under an alias"
            );
        }
        Ok(provider)
    }

    /// Build `name` from `config` and run `setup()`.
    ///
    /// # Errors
    /// Returns `Configuration` for an unknown name or a rejected config, or
    /// whatever `setup()` fails with.
    #[tracing::instrument(skip(self, config))]
    pub async fn create(
        &self,
        name: &str,
        config: Value,
    ) -> ProviderResult<Arc<dyn VectorProvider>> {
        let provider = self.build(name, config)?;
        provider.setup().await?;
        tracing::info!(provider = name, "created vector provider");
        Ok(provider)
    }
}

// =============================================================================
// Process-wide Registry
// =============================================================================

static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();

/// The process-wide registry; the built-ins unless [`install`] ran first.
pub fn global() -> &'static ProviderRegistry {
    GLOBAL.get_or_init(ProviderRegistry::builtin)
}

/// Make `registry` the process-wide registry.
///
/// # Errors
/// Returns `Configuration` if the global registry was already initialised,
/// by an earlier `install` or by a call to [`global`].
pub fn install(registry: ProviderRegistry) -> ProviderResult<()> {
    GLOBAL
        .set(registry)
        .map_err(|_| ProviderError::configuration("provider registry already initialised"))
}
