//! Resource types for the orchestration platform
//!
//! A `GameServer` is the managed workload instance; an `Exposure` is the
//! platform resource binding a set of load-balancer listener ports to one
//! instance and requesting external provisioning. Both follow the platform's
//! metadata/spec/status shape.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// API group/version all gamenet resources belong to
pub const API_VERSION: &str = "gamenet.io/v1";

/// Common object metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Resource name, unique within a namespace
    pub name: String,

    /// Namespace the resource lives in
    #[serde(default)]
    pub namespace: String,

    /// Unique id assigned by the platform on creation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Labels for selection
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Annotations for metadata
    #[serde(default)]
    pub annotations: HashMap<String, String>,

    /// Owners of this resource; deletion of the owner cascades to it
    #[serde(rename = "ownerReferences")]
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
}

/// Reference to an owning resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    pub name: String,

    #[serde(default)]
    pub uid: String,

    /// Whether this owner is the managing controller
    #[serde(default)]
    pub controller: bool,

    /// Whether the owner blocks deletion until this resource is gone
    #[serde(rename = "blockOwnerDeletion")]
    #[serde(default)]
    pub block_owner_deletion: bool,
}

/// Transport protocol for an exposed port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Protocol {
    #[default]
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// Error parsing a protocol name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProtocolError(pub String);

impl fmt::Display for ParseProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown protocol: {}", self.0)
    }
}

impl std::error::Error for ParseProtocolError {}

impl FromStr for Protocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            other => Err(ParseProtocolError(other.to_string())),
        }
    }
}

/// A managed game-server instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameServer {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Kind is always "GameServer"
    pub kind: String,

    pub metadata: ObjectMeta,

    /// Current instance status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GameServerStatus>,
}

/// Observed status of a game-server instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameServerStatus {
    /// Cluster-internal IP assigned to the instance
    #[serde(rename = "podIp")]
    #[serde(default)]
    pub pod_ip: String,
}

impl GameServer {
    /// Create a new GameServer with minimal metadata
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "GameServer".to_string(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                ..Default::default()
            },
            status: None,
        }
    }

    /// Set an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    /// Add an owner reference
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.metadata.owner_references.push(owner);
        self
    }

    /// Set the observed pod IP
    pub fn with_pod_ip(mut self, ip: impl Into<String>) -> Self {
        self.status = Some(GameServerStatus { pod_ip: ip.into() });
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// The cluster-internal IP, empty until the instance is scheduled
    pub fn pod_ip(&self) -> &str {
        self.status.as_ref().map(|s| s.pod_ip.as_str()).unwrap_or("")
    }

    /// Owner reference pointing at this instance
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.metadata.name.clone(),
            uid: self.metadata.uid.clone(),
            controller: true,
            block_owner_deletion: true,
        }
    }

    /// The set that owns this instance, if any (its first owner reference)
    pub fn owning_set(&self) -> Option<&OwnerReference> {
        self.metadata.owner_references.first()
    }
}

/// How an exposure is published outside the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureMode {
    /// Reachable from outside the cluster through the load balancer
    LoadBalancer,
    /// Reachable only inside the cluster; external exposure is off
    ClusterIp,
}

/// One listener-port binding on an exposure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposurePort {
    /// Port name, conventionally the target port rendered as a string
    pub name: String,

    /// Externally advertised listener port on the balancer
    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,

    /// Port the workload listens on internally
    #[serde(rename = "targetPort")]
    pub target_port: u16,
}

/// Desired state of an exposure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureSpec {
    pub mode: ExposureMode,

    /// Pins the exposure to exactly one instance
    #[serde(default)]
    pub selector: HashMap<String, String>,

    #[serde(default)]
    pub ports: Vec<ExposurePort>,
}

/// Observed state of an exposure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExposureStatus {
    /// External endpoints provisioned by the provider; empty until ready
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// An external endpoint on a provisioned balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: String,
}

/// The platform resource binding listener ports to one instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exposure {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Kind is always "Exposure"
    pub kind: String,

    pub metadata: ObjectMeta,

    pub spec: ExposureSpec,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExposureStatus>,
}

impl Exposure {
    /// Create a new load-balancer exposure with empty spec
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "Exposure".to_string(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                ..Default::default()
            },
            spec: ExposureSpec {
                mode: ExposureMode::LoadBalancer,
                selector: HashMap::new(),
                ports: Vec::new(),
            },
            status: None,
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    /// Set an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    /// The listener ports recorded on this exposure
    pub fn listener_ports(&self) -> Vec<u16> {
        self.spec.ports.iter().map(|p| p.port).collect()
    }

    /// First external endpoint, if the provider has provisioned one
    pub fn external_endpoint(&self) -> Option<&Endpoint> {
        self.status.as_ref().and_then(|s| s.endpoints.first())
    }
}

/// Response for listing resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList<T> {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Kind (e.g., "ExposureList", "GameServerList")
    pub kind: String,

    pub items: Vec<T>,
}

impl<T> ResourceList<T> {
    pub fn new(kind: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: kind.into(),
            items,
        }
    }
}

/// Watch event for resource changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent<T> {
    /// Type of event: ADDED, MODIFIED, DELETED
    #[serde(rename = "type")]
    pub event_type: WatchEventType,

    /// The affected resource
    pub object: T,
}

/// Types of watch events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchEventType {
    /// Resource was created
    #[serde(rename = "ADDED")]
    Added,
    /// Resource was modified
    #[serde(rename = "MODIFIED")]
    Modified,
    /// Resource was deleted
    #[serde(rename = "DELETED")]
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse() {
        assert_eq!("UDP".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert_eq!("tcp".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert!("SCTP".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_protocol_default_is_tcp() {
        assert_eq!(Protocol::default(), Protocol::Tcp);
    }

    #[test]
    fn test_game_server_owner_reference() {
        let mut gs = GameServer::new("gs-0", "default");
        gs.metadata.uid = "abc-123".to_string();

        let owner = gs.owner_reference();
        assert_eq!(owner.kind, "GameServer");
        assert_eq!(owner.name, "gs-0");
        assert_eq!(owner.uid, "abc-123");
        assert!(owner.controller);
    }

    #[test]
    fn test_owning_set() {
        let gs = GameServer::new("gs-0", "default");
        assert!(gs.owning_set().is_none());

        let set_ref = OwnerReference {
            api_version: API_VERSION.to_string(),
            kind: "GameServerSet".to_string(),
            name: "fleet".to_string(),
            uid: "set-uid".to_string(),
            controller: true,
            block_owner_deletion: true,
        };
        let gs = gs.with_owner(set_ref.clone());
        assert_eq!(gs.owning_set(), Some(&set_ref));
    }

    #[test]
    fn test_exposure_listener_ports() {
        let mut exposure = Exposure::new("gs-0", "default");
        exposure.spec.ports = vec![
            ExposurePort {
                name: "7777".to_string(),
                port: 30007,
                protocol: Protocol::Udp,
                target_port: 7777,
            },
            ExposurePort {
                name: "8080".to_string(),
                port: 30008,
                protocol: Protocol::Tcp,
                target_port: 8080,
            },
        ];
        assert_eq!(exposure.listener_ports(), vec![30007, 30008]);
    }

    #[test]
    fn test_exposure_external_endpoint() {
        let mut exposure = Exposure::new("gs-0", "default");
        assert!(exposure.external_endpoint().is_none());

        exposure.status = Some(ExposureStatus {
            endpoints: vec![Endpoint {
                ip: "47.1.2.3".to_string(),
            }],
        });
        assert_eq!(exposure.external_endpoint().unwrap().ip, "47.1.2.3");
    }

    #[test]
    fn test_serde_wire_names() {
        let exposure = Exposure::new("gs-0", "default");
        let json = serde_json::to_value(&exposure).unwrap();
        assert_eq!(json["apiVersion"], "gamenet.io/v1");
        assert_eq!(json["kind"], "Exposure");
        assert_eq!(json["spec"]["mode"], "LoadBalancer");
    }

    #[test]
    fn test_watch_event_wire_format() {
        let event = WatchEvent {
            event_type: WatchEventType::Added,
            object: GameServer::new("gs-0", "default"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ADDED");
        assert_eq!(json["object"]["kind"], "GameServer");
    }
}
