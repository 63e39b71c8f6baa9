//! Port allocation cache
//!
//! Listener ports on a cloud load balancer are a finite resource shared by
//! every instance bound to the same balancer. This module owns the
//! per-balancer bitmap of port usage. The cache is rebuilt from the
//! platform's exposure objects at bootstrap, so a process restart loses
//! nothing: there is no private durable store.
//!
//! All mutation happens under one coarse write lock per allocator. Every
//! in-lock operation is pure in-memory bookkeeping bounded by the port-range
//! size; no await point is ever held across the lock.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Errors from port allocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("port allocator not bootstrapped")]
    NotBootstrapped,

    #[error(
        "load balancer '{lb_id}' exhausted: requested {requested} ports, {free} free in [{min_port}, {max_port})"
    )]
    Exhausted {
        lb_id: String,
        requested: usize,
        free: usize,
        min_port: u16,
        max_port: u16,
    },
}

/// Per-balancer port bitmap over `[min_port, max_port)`
struct AllocatorState {
    min_port: u16,
    max_port: u16,
    /// LB id -> allocated flag per port offset. Entries are recycled in
    /// place, never removed, and an absent LB id means untouched.
    tables: HashMap<String, Vec<bool>>,
}

impl AllocatorState {
    fn range_len(&self) -> usize {
        (self.max_port - self.min_port) as usize
    }

    fn table_mut(&mut self, lb_id: &str) -> &mut Vec<bool> {
        let len = self.range_len();
        self.tables
            .entry(lb_id.to_string())
            .or_insert_with(|| vec![false; len])
    }
}

/// Port usage cache for all load balancers a plugin manages
///
/// One allocator per plugin instance. `bootstrap` must complete before any
/// `allocate` call is accepted.
pub struct PortAllocator {
    state: RwLock<Option<AllocatorState>>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    /// Rebuild the cache from existing exposure objects.
    ///
    /// `observed` yields one `(lb_id, listener_ports)` pair per existing
    /// exposure. Ports outside `[min_port, max_port)` are ignored: they are
    /// provider-external reservations, not ours to manage.
    pub async fn bootstrap(
        &self,
        observed: impl IntoIterator<Item = (String, Vec<u16>)>,
        min_port: u16,
        max_port: u16,
    ) {
        let mut state = AllocatorState {
            min_port,
            max_port,
            tables: HashMap::new(),
        };

        for (lb_id, ports) in observed {
            if lb_id.is_empty() {
                continue;
            }
            let table = state.table_mut(&lb_id);
            for port in ports {
                if port >= min_port && port < max_port {
                    table[(port - min_port) as usize] = true;
                } else {
                    debug!(
                        lb_id = %lb_id,
                        port,
                        "ignoring out-of-range port at bootstrap"
                    );
                }
            }
        }

        let lb_count = state.tables.len();
        *self.state.write().await = Some(state);
        debug!(lb_count, min_port, max_port, "port cache bootstrapped");
    }

    /// Allocate `count` free ports on one balancer.
    ///
    /// Scans the range in ascending order and marks each returned port
    /// allocated. The marking is atomic: on exhaustion nothing is marked and
    /// the call fails, never returning a shorter list.
    pub async fn allocate(
        &self,
        lb_id: &str,
        count: usize,
    ) -> Result<Vec<u16>, AllocationError> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(AllocationError::NotBootstrapped)?;

        let min_port = state.min_port;
        let max_port = state.max_port;
        let table = state.table_mut(lb_id);

        let free: Vec<u16> = table
            .iter()
            .enumerate()
            .filter(|(_, allocated)| !**allocated)
            .map(|(offset, _)| min_port + offset as u16)
            .take(count)
            .collect();

        if free.len() < count {
            let total_free = table.iter().filter(|allocated| !**allocated).count();
            return Err(AllocationError::Exhausted {
                lb_id: lb_id.to_string(),
                requested: count,
                free: total_free,
                min_port,
                max_port,
            });
        }

        for port in &free {
            table[(port - min_port) as usize] = true;
        }

        debug!(lb_id = %lb_id, ports = ?free, "allocated listener ports");
        Ok(free)
    }

    /// Mark a port free.
    ///
    /// Unknown LB ids and out-of-range ports are a no-op: cleanup may race
    /// with, or trail, an external deletion of the balancer.
    pub async fn deallocate(&self, lb_id: &str, port: u16) {
        let mut guard = self.state.write().await;
        let Some(state) = guard.as_mut() else {
            warn!(lb_id = %lb_id, port, "deallocate before bootstrap ignored");
            return;
        };

        if port < state.min_port || port >= state.max_port {
            return;
        }
        let offset = (port - state.min_port) as usize;
        if let Some(table) = state.tables.get_mut(lb_id) {
            table[offset] = false;
            debug!(lb_id = %lb_id, port, "deallocated listener port");
        }
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}
