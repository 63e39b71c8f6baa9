//! In-memory orchestrator client for tests and demos
//!
//! `FakeClient` keeps objects in concurrent maps, mints UIDs on creation and
//! broadcasts watch events, so a whole plugin lifecycle can be exercised
//! without a cluster. It is exported publicly: integration tests and local
//! demos both drive the plugins through it.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::resources::{
    Endpoint, Exposure, ExposureStatus, GameServer, WatchEvent, WatchEventType,
};
use super::{ApiError, OrchestratorClient, WatchStream};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// In-memory stand-in for the orchestration platform
pub struct FakeClient {
    game_servers: DashMap<String, GameServer>,
    exposures: DashMap<String, Exposure>,
    events: broadcast::Sender<WatchEvent<GameServer>>,
}

fn object_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

impl FakeClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            game_servers: DashMap::new(),
            exposures: DashMap::new(),
            events,
        }
    }

    /// Seed a game server, publishing an ADDED event
    pub fn put_game_server(&self, mut gs: GameServer) -> GameServer {
        if gs.metadata.uid.is_empty() {
            gs.metadata.uid = Uuid::new_v4().to_string();
        }
        let key = object_key(gs.namespace(), gs.name());
        self.game_servers.insert(key, gs.clone());
        let _ = self.events.send(WatchEvent {
            event_type: WatchEventType::Added,
            object: gs.clone(),
        });
        gs
    }

    /// Remove a game server, publishing a DELETED event
    pub fn remove_game_server(&self, namespace: &str, name: &str) -> Option<GameServer> {
        let (_, gs) = self.game_servers.remove(&object_key(namespace, name))?;
        let _ = self.events.send(WatchEvent {
            event_type: WatchEventType::Deleted,
            object: gs.clone(),
        });
        Some(gs)
    }

    /// Seed an exposure object directly, bypassing create semantics
    pub fn put_exposure(&self, mut exposure: Exposure) -> Exposure {
        if exposure.metadata.uid.is_empty() {
            exposure.metadata.uid = Uuid::new_v4().to_string();
        }
        let key = object_key(&exposure.metadata.namespace, &exposure.metadata.name);
        self.exposures.insert(key, exposure.clone());
        exposure
    }

    /// Read back an exposure without going through the trait
    pub fn exposure(&self, namespace: &str, name: &str) -> Option<Exposure> {
        self.exposures
            .get(&object_key(namespace, name))
            .map(|e| e.clone())
    }

    /// Read back a game server without going through the trait
    pub fn game_server(&self, namespace: &str, name: &str) -> Option<GameServer> {
        self.game_servers
            .get(&object_key(namespace, name))
            .map(|gs| gs.clone())
    }

    /// Simulate the provider provisioning external endpoints
    pub fn set_exposure_endpoints(&self, namespace: &str, name: &str, ips: &[&str]) {
        if let Some(mut exposure) = self.exposures.get_mut(&object_key(namespace, name)) {
            exposure.status = Some(ExposureStatus {
                endpoints: ips
                    .iter()
                    .map(|ip| Endpoint { ip: ip.to_string() })
                    .collect(),
            });
        }
    }
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrchestratorClient for FakeClient {
    async fn list_exposures(&self, namespace: Option<&str>) -> Result<Vec<Exposure>, ApiError> {
        Ok(self
            .exposures
            .iter()
            .filter(|e| namespace.map_or(true, |ns| e.metadata.namespace == ns))
            .map(|e| e.clone())
            .collect())
    }

    async fn get_exposure(&self, namespace: &str, name: &str) -> Result<Exposure, ApiError> {
        self.exposures
            .get(&object_key(namespace, name))
            .map(|e| e.clone())
            .ok_or_else(|| ApiError::not_found("Exposure", namespace, name))
    }

    async fn create_exposure(&self, exposure: &Exposure) -> Result<Exposure, ApiError> {
        let key = object_key(&exposure.metadata.namespace, &exposure.metadata.name);
        if self.exposures.contains_key(&key) {
            return Err(ApiError::already_exists(
                "Exposure",
                &exposure.metadata.namespace,
                &exposure.metadata.name,
            ));
        }
        let mut created = exposure.clone();
        created.metadata.uid = Uuid::new_v4().to_string();
        self.exposures.insert(key, created.clone());
        Ok(created)
    }

    async fn update_exposure(&self, exposure: &Exposure) -> Result<Exposure, ApiError> {
        let key = object_key(&exposure.metadata.namespace, &exposure.metadata.name);
        let Some(mut entry) = self.exposures.get_mut(&key) else {
            return Err(ApiError::not_found(
                "Exposure",
                &exposure.metadata.namespace,
                &exposure.metadata.name,
            ));
        };
        // The status subresource is owned by the provider side; keep it.
        let status = entry.status.clone();
        *entry = exposure.clone();
        if entry.status.is_none() {
            entry.status = status;
        }
        Ok(entry.clone())
    }

    async fn delete_exposure(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
        self.exposures
            .remove(&object_key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("Exposure", namespace, name))
    }

    async fn update_game_server(&self, gs: &GameServer) -> Result<GameServer, ApiError> {
        let key = object_key(gs.namespace(), gs.name());
        let Some(mut entry) = self.game_servers.get_mut(&key) else {
            return Err(ApiError::not_found("GameServer", gs.namespace(), gs.name()));
        };
        *entry = gs.clone();
        let updated = entry.clone();
        drop(entry);
        let _ = self.events.send(WatchEvent {
            event_type: WatchEventType::Modified,
            object: updated.clone(),
        });
        Ok(updated)
    }

    async fn watch_game_servers(&self, namespace: Option<&str>) -> Result<WatchStream, ApiError> {
        let rx = self.events.subscribe();
        let namespace = namespace.map(|ns| ns.to_string());
        let stream = futures::stream::unfold(rx, move |mut rx| {
            let namespace = namespace.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            if let Some(ref ns) = namespace {
                                if event.object.namespace() != ns {
                                    continue;
                                }
                            }
                            return Some((Ok(event), rx));
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(Box::pin(stream))
    }
}
