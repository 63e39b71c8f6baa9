//! Per-instance network annotation surface
//!
//! The platform stores all network intent and state on the instance itself:
//! the provider conf list, the desired disabled flag and the computed
//! network status all live in annotations. `NetworkManager` is the one
//! place that reads and writes them. Status updates mutate a copy of the
//! instance; the host reconciler persists whatever a hook returns.

use tracing::debug;

use crate::api::GameServer;
use crate::config::NetworkConfParam;
use crate::errors::PluginError;
use crate::status::NetworkStatus;

/// Instance annotation holding the JSON conf param list
pub const NETWORK_CONF_ANNOTATION: &str = "gamenet.io/network-conf";
/// Instance annotation holding the desired exposure-off flag
pub const NETWORK_DISABLED_ANNOTATION: &str = "gamenet.io/network-disabled";
/// Instance annotation holding the persisted NetworkStatus JSON
pub const NETWORK_STATUS_ANNOTATION: &str = "gamenet.io/network-status";

/// Reads and writes one instance's network annotations
pub struct NetworkManager {
    gs: GameServer,
}

impl NetworkManager {
    pub fn new(gs: &GameServer) -> Self {
        Self { gs: gs.clone() }
    }

    /// The instance's network configuration.
    ///
    /// A missing annotation is an invariant violation: instances without
    /// network conf never reach the plugin.
    pub fn network_conf(&self) -> Result<Vec<NetworkConfParam>, PluginError> {
        let raw = self
            .gs
            .metadata
            .annotations
            .get(NETWORK_CONF_ANNOTATION)
            .ok_or_else(|| {
                PluginError::internal(format!(
                    "game server {}/{} has no {} annotation",
                    self.gs.namespace(),
                    self.gs.name(),
                    NETWORK_CONF_ANNOTATION
                ))
            })?;
        serde_json::from_str(raw).map_err(|e| {
            PluginError::internal(format!("malformed network conf annotation: {}", e))
        })
    }

    /// Whether the instance wants external exposure switched off.
    /// Missing or unparsable values default to false.
    pub fn network_disabled(&self) -> bool {
        self.gs
            .metadata
            .annotations
            .get(NETWORK_DISABLED_ANNOTATION)
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(false)
    }

    /// The recorded network status, `None` if no status was written yet
    pub fn network_status(&self) -> Result<Option<NetworkStatus>, PluginError> {
        let Some(raw) = self.gs.metadata.annotations.get(NETWORK_STATUS_ANNOTATION) else {
            return Ok(None);
        };
        let status = serde_json::from_str(raw).map_err(|e| {
            PluginError::internal(format!("malformed network status annotation: {}", e))
        })?;
        Ok(Some(status))
    }

    /// Write `status` into the annotation on a copy of the instance.
    ///
    /// The copy is what the hook returns to its caller; persistence is the
    /// host reconciler's job.
    pub fn update_network_status(
        &self,
        status: NetworkStatus,
    ) -> Result<GameServer, PluginError> {
        let raw = serde_json::to_string(&status).map_err(|e| {
            PluginError::internal(format!("failed to serialize network status: {}", e))
        })?;

        let mut gs = self.gs.clone();
        gs.metadata
            .annotations
            .insert(NETWORK_STATUS_ANNOTATION.to_string(), raw);
        debug!(
            game_server = %gs.name(),
            state = ?status.current_network_state,
            "updated network status annotation"
        );
        Ok(gs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfParam, LB_IDS_CONF_NAME};
    use crate::status::{NetworkState, NetworkStatus};

    fn gs_with_conf() -> GameServer {
        let conf = vec![NetworkConfParam::new(LB_IDS_CONF_NAME, "lb-1")];
        GameServer::new("gs-0", "default")
            .with_annotation(NETWORK_CONF_ANNOTATION, serde_json::to_string(&conf).unwrap())
    }

    #[test]
    fn test_network_conf_round_trip() {
        let manager = NetworkManager::new(&gs_with_conf());
        let params = manager.network_conf().unwrap();
        assert_eq!(params, vec![NetworkConfParam::new(LB_IDS_CONF_NAME, "lb-1")]);
    }

    #[test]
    fn test_missing_conf_is_internal_error() {
        let manager = NetworkManager::new(&GameServer::new("gs-0", "default"));
        let err = manager.network_conf().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InternalError);
    }

    #[test]
    fn test_malformed_conf_is_internal_error() {
        let gs = GameServer::new("gs-0", "default")
            .with_annotation(NETWORK_CONF_ANNOTATION, "not json");
        let manager = NetworkManager::new(&gs);
        assert!(manager.network_conf().is_err());
    }

    #[test]
    fn test_network_disabled_defaults_false() {
        let manager = NetworkManager::new(&GameServer::new("gs-0", "default"));
        assert!(!manager.network_disabled());

        let gs = GameServer::new("gs-0", "default")
            .with_annotation(NETWORK_DISABLED_ANNOTATION, "maybe");
        assert!(!NetworkManager::new(&gs).network_disabled());

        let gs = GameServer::new("gs-0", "default")
            .with_annotation(NETWORK_DISABLED_ANNOTATION, "true");
        assert!(NetworkManager::new(&gs).network_disabled());
    }

    #[test]
    fn test_status_round_trip_through_annotation() {
        let manager = NetworkManager::new(&GameServer::new("gs-0", "default"));
        assert!(manager.network_status().unwrap().is_none());

        let updated = manager
            .update_network_status(NetworkStatus::not_ready())
            .unwrap();

        let manager = NetworkManager::new(&updated);
        let status = manager.network_status().unwrap().unwrap();
        assert_eq!(status.current_network_state, NetworkState::NotReady);
    }

    #[test]
    fn test_malformed_status_is_internal_error() {
        let gs = GameServer::new("gs-0", "default")
            .with_annotation(NETWORK_STATUS_ANNOTATION, "{broken");
        let manager = NetworkManager::new(&gs);
        assert!(manager.network_status().is_err());
    }
}
