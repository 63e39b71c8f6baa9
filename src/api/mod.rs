//! Orchestration API client
//!
//! The plugins never talk to a cloud SDK directly; every side effect goes
//! through [`OrchestratorClient`], an abstraction over the orchestration
//! platform's resource API. `HttpClient` is the real implementation;
//! `FakeClient` is an in-memory one used by tests and demos.

pub mod fake;
pub mod http;
pub mod resources;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

pub use fake::FakeClient;
pub use http::HttpClient;
pub use resources::{
    Endpoint, Exposure, ExposureMode, ExposurePort, ExposureSpec, ExposureStatus, GameServer,
    GameServerStatus, ObjectMeta, OwnerReference, Protocol, ResourceList, WatchEvent,
    WatchEventType, API_VERSION,
};

/// Errors from the orchestration API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn not_found(kind: &str, namespace: &str, name: &str) -> Self {
        ApiError::NotFound {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn already_exists(kind: &str, namespace: &str, name: &str) -> Self {
        ApiError::AlreadyExists {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Whether this error means the object does not exist, so callers can
    /// branch into self-healing paths
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Stream of game-server watch events
pub type WatchStream =
    Pin<Box<dyn Stream<Item = Result<WatchEvent<GameServer>, ApiError>> + Send>>;

/// Client for the orchestration platform's resource API.
///
/// All calls are cancel-safe in the usual async sense: dropping the returned
/// future abandons the in-flight request. Implementations must be shareable
/// across concurrently running lifecycle hooks.
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    /// List exposures in one namespace, or in all namespaces when `None`
    async fn list_exposures(&self, namespace: Option<&str>) -> Result<Vec<Exposure>, ApiError>;

    async fn get_exposure(&self, namespace: &str, name: &str) -> Result<Exposure, ApiError>;

    async fn create_exposure(&self, exposure: &Exposure) -> Result<Exposure, ApiError>;

    async fn update_exposure(&self, exposure: &Exposure) -> Result<Exposure, ApiError>;

    async fn delete_exposure(&self, namespace: &str, name: &str) -> Result<(), ApiError>;

    async fn update_game_server(&self, gs: &GameServer) -> Result<GameServer, ApiError>;

    /// Watch game servers in one namespace, or in all namespaces when `None`
    async fn watch_game_servers(&self, namespace: Option<&str>) -> Result<WatchStream, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(ApiError::not_found("Exposure", "default", "gs-0").is_not_found());
        assert!(!ApiError::Http("boom".to_string()).is_not_found());
    }
}
