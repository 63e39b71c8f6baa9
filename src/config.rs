//! Network configuration parsing
//!
//! Instances describe their exposure needs as an ordered list of provider
//! `(name, value)` pairs. This module parses the pairs the reference LB
//! plugin recognizes, plus the provider-options file the binary loads at
//! startup. Malformed individual entries are skipped, never fatal: a bad
//! port or boolean drops that entry and the rest of the parse proceeds.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::api::Protocol;

/// Conf name selecting the balancer id
pub const LB_IDS_CONF_NAME: &str = "LbIds";
/// Conf name carrying the `port[/protocol]` comma-separated list
pub const PORT_PROTOCOLS_CONF_NAME: &str = "PortProtocols";
/// Conf name for the fixed-identity flag
pub const FIXED_CONF_NAME: &str = "Fixed";

/// One provider-specific configuration pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfParam {
    pub name: String,
    pub value: String,
}

impl NetworkConfParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parsed network configuration for the reference LB plugin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConf {
    /// Balancer id the instance binds to; empty if not configured
    pub lb_id: String,

    /// Ports the workload listens on internally
    pub target_ports: Vec<u16>,

    /// Protocol per target port, same length as `target_ports`
    pub protocols: Vec<Protocol>,

    /// Fixed-identity mode: ports and ownership persist across replacement
    pub fixed: bool,
}

/// Parse the recognized conf names out of an ordered param list.
///
/// Unrecognized names are ignored. A `PortProtocols` entry with an
/// unparsable port or protocol is skipped; an unparsable `Fixed` boolean
/// leaves the flag false.
pub fn parse_network_conf(params: &[NetworkConfParam]) -> NetworkConf {
    let mut conf = NetworkConf::default();

    for param in params {
        match param.name.as_str() {
            LB_IDS_CONF_NAME => {
                conf.lb_id = param.value.clone();
            }
            PORT_PROTOCOLS_CONF_NAME => {
                for pp in param.value.split(',') {
                    let mut parts = pp.splitn(2, '/');
                    let port_str = parts.next().unwrap_or("");
                    let port = match port_str.trim().parse::<u16>() {
                        Ok(p) => p,
                        Err(_) => {
                            warn!(entry = %pp, "skipping unparsable port entry");
                            continue;
                        }
                    };
                    let protocol = match parts.next() {
                        None => Protocol::default(),
                        Some(proto) => match proto.trim().parse::<Protocol>() {
                            Ok(p) => p,
                            Err(_) => {
                                warn!(entry = %pp, "skipping entry with unknown protocol");
                                continue;
                            }
                        },
                    };
                    conf.target_ports.push(port);
                    conf.protocols.push(protocol);
                }
            }
            FIXED_CONF_NAME => match param.value.trim().parse::<bool>() {
                Ok(v) => conf.fixed = v,
                Err(_) => {
                    warn!(value = %param.value, "ignoring unparsable Fixed flag");
                }
            },
            _ => {}
        }
    }

    conf
}

/// Render an allocated-ports list for the instance annotation
pub fn ports_to_csv(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse the allocated-ports annotation; unparsable entries are skipped
pub fn ports_from_csv(csv: &str) -> Vec<u16> {
    csv.split(',')
        .filter_map(|p| p.trim().parse::<u16>().ok())
        .collect()
}

/// Errors loading the provider-options file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse options file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid port range [{min_port}, {max_port}): range must be non-empty")]
    InvalidRange { min_port: u16, max_port: u16 },
}

/// Provider options for the reference LB plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOptions {
    /// Lowest listener port the plugin may allocate (inclusive)
    pub min_port: u16,

    /// Upper bound of the listener port range (exclusive)
    pub max_port: u16,
}

impl ProviderOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_port >= self.max_port {
            return Err(ConfigError::InvalidRange {
                min_port: self.min_port,
                max_port: self.max_port,
            });
        }
        Ok(())
    }
}

/// Load and validate provider options from a YAML file.
/// This is the I/O boundary; parsing and validation are pure.
pub fn load_provider_options(path: &Path) -> Result<ProviderOptions, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let options: ProviderOptions = serde_yaml::from_str(&content)?;
    options.validate()?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_port_protocols() {
        let params = vec![NetworkConfParam::new(
            PORT_PROTOCOLS_CONF_NAME,
            "7777/UDP,8080",
        )];
        let conf = parse_network_conf(&params);

        assert_eq!(conf.target_ports, vec![7777, 8080]);
        assert_eq!(conf.protocols, vec![Protocol::Udp, Protocol::Tcp]);
    }

    #[test]
    fn test_parse_full_conf() {
        let params = vec![
            NetworkConfParam::new(LB_IDS_CONF_NAME, "lb-1"),
            NetworkConfParam::new(PORT_PROTOCOLS_CONF_NAME, "7777/UDP"),
            NetworkConfParam::new(FIXED_CONF_NAME, "true"),
        ];
        let conf = parse_network_conf(&params);

        assert_eq!(conf.lb_id, "lb-1");
        assert_eq!(conf.target_ports, vec![7777]);
        assert!(conf.fixed);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let params = vec![
            NetworkConfParam::new(PORT_PROTOCOLS_CONF_NAME, "abc/UDP,7777,99999,8080/SCTP"),
            NetworkConfParam::new(FIXED_CONF_NAME, "yes"),
        ];
        let conf = parse_network_conf(&params);

        // "abc" and "99999" fail the u16 parse; SCTP is unknown.
        assert_eq!(conf.target_ports, vec![7777]);
        assert_eq!(conf.protocols, vec![Protocol::Tcp]);
        // "yes" is not a Rust bool literal; flag defaults false.
        assert!(!conf.fixed);
    }

    #[test]
    fn test_unrecognized_names_ignored() {
        let params = vec![
            NetworkConfParam::new("SomethingElse", "value"),
            NetworkConfParam::new(LB_IDS_CONF_NAME, "lb-2"),
        ];
        let conf = parse_network_conf(&params);
        assert_eq!(conf.lb_id, "lb-2");
    }

    #[test]
    fn test_ports_csv_round_trip() {
        let csv = ports_to_csv(&[8000, 8003, 8005]);
        assert_eq!(csv, "8000,8003,8005");
        assert_eq!(ports_from_csv(&csv), vec![8000, 8003, 8005]);
    }

    #[test]
    fn test_ports_from_csv_skips_garbage() {
        assert_eq!(ports_from_csv("8000,abc,8001"), vec![8000, 8001]);
        assert!(ports_from_csv("").is_empty());
    }

    #[test]
    fn test_load_provider_options() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"minPort: 8000\nmaxPort: 8100\n").unwrap();

        let options = load_provider_options(file.path()).unwrap();
        assert_eq!(options.min_port, 8000);
        assert_eq!(options.max_port, 8100);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let options = ProviderOptions {
            min_port: 8100,
            max_port: 8000,
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }
}
