//! Network status state machine
//!
//! An instance's network status moves Uninitialized -> NotReady -> Ready.
//! There is no timer: every `on_updated` invocation re-derives the state
//! from the exposure object's observed endpoints, so lack of external
//! progress just repeats the same branch next time. Ready is terminal for a
//! live instance; deletion removes instance and status together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Exposure, Protocol};

/// Reachability state derived from the exposure object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkState {
    /// Exposure exists but has no external endpoint yet
    NotReady,
    /// External endpoint provisioned; addresses are populated
    Ready,
}

/// One (IP, ports) entry in the computed address lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddress {
    pub ip: String,

    #[serde(default)]
    pub ports: Vec<NetworkPort>,
}

/// A single named port on an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPort {
    pub name: String,
    pub port: u16,
    pub protocol: Protocol,
}

/// The network status persisted onto the instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    #[serde(rename = "currentNetworkState")]
    pub current_network_state: NetworkState,

    #[serde(rename = "internalAddresses")]
    #[serde(default)]
    pub internal_addresses: Vec<NetworkAddress>,

    #[serde(rename = "externalAddresses")]
    #[serde(default)]
    pub external_addresses: Vec<NetworkAddress>,

    /// Set once, when the status first appears
    #[serde(rename = "createTime")]
    pub create_time: DateTime<Utc>,

    /// Refreshed whenever the state changes
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl NetworkStatus {
    /// Initial status: NotReady with no addresses
    pub fn not_ready() -> Self {
        let now = Utc::now();
        Self {
            current_network_state: NetworkState::NotReady,
            internal_addresses: Vec::new(),
            external_addresses: Vec::new(),
            create_time: now,
            last_transition_time: now,
        }
    }

    /// Move to `state`, refreshing the transition time only on change
    pub fn transition(&mut self, state: NetworkState) {
        if self.current_network_state != state {
            self.last_transition_time = Utc::now();
        }
        self.current_network_state = state;
    }
}

/// Derive the instance's network state from its exposure object
pub fn derive_state(exposure: &Exposure) -> NetworkState {
    if exposure.external_endpoint().is_some() {
        NetworkState::Ready
    } else {
        NetworkState::NotReady
    }
}

/// Compute one (internal, external) address pair per configured port.
///
/// Internal: instance IP and target port. External: the exposure's first
/// endpoint IP and the externally advertised port. Protocol and port name
/// carry through unchanged. Returns `None` while no endpoint exists.
pub fn compute_address_pairs(
    pod_ip: &str,
    exposure: &Exposure,
) -> Option<(Vec<NetworkAddress>, Vec<NetworkAddress>)> {
    let endpoint = exposure.external_endpoint()?;

    let mut internal = Vec::with_capacity(exposure.spec.ports.len());
    let mut external = Vec::with_capacity(exposure.spec.ports.len());

    for port in &exposure.spec.ports {
        internal.push(NetworkAddress {
            ip: pod_ip.to_string(),
            ports: vec![NetworkPort {
                name: port.name.clone(),
                port: port.target_port,
                protocol: port.protocol,
            }],
        });
        external.push(NetworkAddress {
            ip: endpoint.ip.clone(),
            ports: vec![NetworkPort {
                name: port.name.clone(),
                port: port.port,
                protocol: port.protocol,
            }],
        });
    }

    Some((internal, external))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, ExposurePort, ExposureStatus};

    fn exposure_with_port() -> Exposure {
        let mut exposure = Exposure::new("gs-0", "default");
        exposure.spec.ports = vec![ExposurePort {
            name: "7777".to_string(),
            port: 30007,
            protocol: Protocol::Udp,
            target_port: 7777,
        }];
        exposure
    }

    #[test]
    fn test_derive_state_without_endpoint() {
        let exposure = exposure_with_port();
        assert_eq!(derive_state(&exposure), NetworkState::NotReady);
    }

    #[test]
    fn test_derive_state_with_endpoint() {
        let mut exposure = exposure_with_port();
        exposure.status = Some(ExposureStatus {
            endpoints: vec![Endpoint {
                ip: "47.1.2.3".to_string(),
            }],
        });
        assert_eq!(derive_state(&exposure), NetworkState::Ready);
    }

    #[test]
    fn test_no_pairs_without_endpoint() {
        let exposure = exposure_with_port();
        assert!(compute_address_pairs("10.0.0.5", &exposure).is_none());
    }

    #[test]
    fn test_address_pair_per_configured_port() {
        let mut exposure = exposure_with_port();
        exposure.status = Some(ExposureStatus {
            endpoints: vec![Endpoint {
                ip: "47.1.2.3".to_string(),
            }],
        });

        let (internal, external) = compute_address_pairs("10.0.0.5", &exposure).unwrap();

        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].ip, "10.0.0.5");
        assert_eq!(internal[0].ports[0].port, 7777);
        assert_eq!(internal[0].ports[0].protocol, Protocol::Udp);

        assert_eq!(external.len(), 1);
        assert_eq!(external[0].ip, "47.1.2.3");
        assert_eq!(external[0].ports[0].port, 30007);
        assert_eq!(external[0].ports[0].protocol, Protocol::Udp);
    }

    #[test]
    fn test_transition_refreshes_only_on_change() {
        let mut status = NetworkStatus::not_ready();
        let initial = status.last_transition_time;

        status.transition(NetworkState::NotReady);
        assert_eq!(status.last_transition_time, initial);

        status.transition(NetworkState::Ready);
        assert_eq!(status.current_network_state, NetworkState::Ready);
        assert!(status.last_transition_time >= initial);
    }

    #[test]
    fn test_status_wire_names() {
        let status = NetworkStatus::not_ready();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["currentNetworkState"], "NotReady");
        assert!(json.get("createTime").is_some());
        assert!(json.get("lastTransitionTime").is_some());
    }
}
