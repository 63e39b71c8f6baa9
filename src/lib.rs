//! # gamenet
//!
//! Pluggable network exposure for containerized game servers.
//!
//! For every managed instance the subsystem decides whether and how it is
//! reachable from outside the cluster through a cloud load balancer, and it
//! owns the scarce shared resource of listener ports across all instances
//! bound to the same balancer.
//!
//! ## Core pieces
//!
//! - [`allocator::PortAllocator`]: per-balancer bitmap of port usage,
//!   rebuilt from existing exposure objects at bootstrap
//! - [`status`]: derives NotReady/Ready from an exposure's observed state
//! - [`plugin::CloudLbPlugin`]: the reference provider, orchestrating the
//!   lifecycle hooks
//! - [`plugin::PluginRegistry`]: named plugin instances, pure lookup
//!
//! The event-driven reconcile loop that invokes the hooks, the workload
//! definition types and the cloud SDK calls that provision a physical
//! balancer all live outside this crate; the binary here carries a thin
//! watch-and-dispatch loop standing in for the host reconciler.

pub mod allocator;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod manager;
pub mod plugin;
pub mod status;

pub use allocator::{AllocationError, PortAllocator};
pub use api::{FakeClient, HttpClient, OrchestratorClient};
pub use config::{parse_network_conf, NetworkConf, NetworkConfParam, ProviderOptions};
pub use errors::{ErrorKind, PluginError};
pub use manager::NetworkManager;
pub use plugin::{CloudLbPlugin, NetworkPlugin, PluginRegistry};
pub use status::{NetworkState, NetworkStatus};
