//! Plugin contract and registry
//!
//! Every cloud provider is an interchangeable implementation of
//! [`NetworkPlugin`]: one capability set, many provider bodies. The registry
//! is a plain name-to-instance map built explicitly at startup and passed by
//! reference to the controller; nothing registers itself as an import-time
//! side effect.

pub mod lb;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::api::{GameServer, OrchestratorClient};
use crate::config::ProviderOptions;
use crate::errors::PluginError;

pub use lb::CloudLbPlugin;

/// Lifecycle contract every network plugin satisfies.
///
/// Hooks are invoked concurrently, once per instance event, with no ordering
/// guarantee between distinct instances. A hook that mutates the instance
/// (annotations, status) returns the updated copy; the host reconciler
/// persists it and retries failed hooks by re-invoking them later.
/// Cancellation is the usual async kind: the host drops the future.
#[async_trait]
pub trait NetworkPlugin: Send + Sync {
    /// Primary name, used by per-instance network-type references
    fn name(&self) -> &str;

    /// Secondary lookup name
    fn alias(&self) -> &str;

    /// One-time bootstrap: scan existing exposure objects and rebuild any
    /// internal caches. Must complete before lifecycle hooks are delivered.
    async fn init(
        &self,
        client: &dyn OrchestratorClient,
        options: &ProviderOptions,
    ) -> Result<(), PluginError>;

    /// Instance created
    async fn on_added(
        &self,
        client: &dyn OrchestratorClient,
        gs: GameServer,
    ) -> Result<GameServer, PluginError>;

    /// Instance changed (or periodic resync)
    async fn on_updated(
        &self,
        client: &dyn OrchestratorClient,
        gs: GameServer,
    ) -> Result<GameServer, PluginError>;

    /// Instance deleted
    async fn on_deleted(
        &self,
        client: &dyn OrchestratorClient,
        gs: GameServer,
    ) -> Result<(), PluginError>;
}

/// Errors building the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("plugin '{0}' already registered")]
    Duplicate(String),
}

/// Named plugin instances; pure lookup, no logic of its own
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn NetworkPlugin>>,
    aliases: HashMap<String, String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under its name and alias
    pub fn register(&mut self, plugin: Arc<dyn NetworkPlugin>) -> Result<(), RegistryError> {
        let name = plugin.name().to_string();
        if self.plugins.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.aliases.insert(plugin.alias().to_string(), name.clone());
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Look up a plugin by name or alias
    pub fn get(&self, name_or_alias: &str) -> Option<Arc<dyn NetworkPlugin>> {
        if let Some(plugin) = self.plugins.get(name_or_alias) {
            return Some(plugin.clone());
        }
        let name = self.aliases.get(name_or_alias)?;
        self.plugins.get(name).cloned()
    }

    /// Registered plugin names
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(|n| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
