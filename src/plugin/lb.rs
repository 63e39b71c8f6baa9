//! Reference cloud load-balancer plugin
//!
//! Orchestrates the full exposure lifecycle for instances behind a cloud
//! load balancer: allocates listener ports from the shared per-balancer
//! pool, creates and heals the exposure object, flips its mode when the
//! instance toggles exposure, derives Ready/NotReady, and releases ports on
//! deletion. Other providers implement the same contract with their own key
//! names and provisioning quirks.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::allocator::PortAllocator;
use crate::api::{
    Exposure, ExposureMode, ExposurePort, GameServer, OrchestratorClient, OwnerReference,
};
use crate::config::{self, parse_network_conf, NetworkConf, ProviderOptions};
use crate::errors::PluginError;
use crate::manager::NetworkManager;
use crate::plugin::NetworkPlugin;
use crate::status::{self, NetworkState, NetworkStatus};

/// Plugin name, referenced by per-instance network-type annotations
pub const LB_NETWORK_NAME: &str = "Cloud-LB";
/// Registry alias
pub const LB_NETWORK_ALIAS: &str = "LB-Network";

/// Exposure annotation and label carrying the owning balancer id
pub const LB_ID_ANNOTATION: &str = "gamenet.io/load-balancer-id";
pub const LB_ID_LABEL: &str = "gamenet.io/load-balancer-id";
/// Exposure annotation forcing listener override on the provider side
pub const OVERRIDE_LISTENERS_ANNOTATION: &str = "gamenet.io/override-listeners";
/// Instance annotation recording previously allocated listener ports
pub const ALLOCATED_PORTS_ANNOTATION: &str = "gamenet.io/lb-ports-allocated";
/// Selector key pinning an exposure to one instance
pub const INSTANCE_SELECTOR_KEY: &str = "gamenet.io/instance-name";

/// Reference load-balancer network plugin
pub struct CloudLbPlugin {
    allocator: PortAllocator,
}

impl CloudLbPlugin {
    pub fn new() -> Self {
        Self {
            allocator: PortAllocator::new(),
        }
    }

    /// Ports for this instance: recorded ones if a prior allocation left an
    /// annotation (fixed-identity replacement), fresh ones otherwise. A
    /// fresh allocation is recorded back onto `gs`.
    async fn reserve_ports(
        &self,
        gs: &mut GameServer,
        conf: &NetworkConf,
    ) -> Result<Vec<u16>, PluginError> {
        if let Some(csv) = gs.metadata.annotations.get(ALLOCATED_PORTS_ANNOTATION) {
            let ports = config::ports_from_csv(csv);
            if ports.len() != conf.target_ports.len() {
                return Err(PluginError::internal(format!(
                    "annotation {} records {} ports but {} target ports are configured",
                    ALLOCATED_PORTS_ANNOTATION,
                    ports.len(),
                    conf.target_ports.len()
                )));
            }
            debug!(game_server = %gs.name(), ?ports, "reusing recorded listener ports");
            return Ok(ports);
        }

        let ports = self
            .allocator
            .allocate(&conf.lb_id, conf.target_ports.len())
            .await?;
        gs.metadata.annotations.insert(
            ALLOCATED_PORTS_ANNOTATION.to_string(),
            config::ports_to_csv(&ports),
        );
        Ok(ports)
    }

    /// Create the exposure object for an instance, allocating or reusing
    /// ports as needed. The shared path behind `on_added` and the
    /// missing-exposure self-heal.
    async fn ensure_exposure(
        &self,
        client: &dyn OrchestratorClient,
        mut gs: GameServer,
    ) -> Result<GameServer, PluginError> {
        let manager = NetworkManager::new(&gs);
        let conf = parse_network_conf(&manager.network_conf()?);
        if conf.lb_id.is_empty() {
            return Err(PluginError::internal(format!(
                "game server {}/{} has no load balancer id configured",
                gs.namespace(),
                gs.name()
            )));
        }

        let ports = self.reserve_ports(&mut gs, &conf).await?;
        let exposure = build_exposure(&gs, &conf, &ports);
        client.create_exposure(&exposure).await?;

        info!(
            game_server = %gs.name(),
            lb_id = %conf.lb_id,
            ?ports,
            "created exposure"
        );
        Ok(gs)
    }
}

impl Default for CloudLbPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkPlugin for CloudLbPlugin {
    fn name(&self) -> &str {
        LB_NETWORK_NAME
    }

    fn alias(&self) -> &str {
        LB_NETWORK_ALIAS
    }

    async fn init(
        &self,
        client: &dyn OrchestratorClient,
        options: &ProviderOptions,
    ) -> Result<(), PluginError> {
        let exposures = client.list_exposures(None).await?;

        let observed = exposures.iter().filter_map(|exposure| {
            if exposure.spec.mode != ExposureMode::LoadBalancer {
                return None;
            }
            let lb_id = exposure.metadata.labels.get(LB_ID_LABEL)?;
            Some((lb_id.clone(), exposure.listener_ports()))
        });

        self.allocator
            .bootstrap(
                observed.collect::<Vec<_>>(),
                options.min_port,
                options.max_port,
            )
            .await;

        info!(
            min_port = options.min_port,
            max_port = options.max_port,
            exposures = exposures.len(),
            "LB plugin initialized"
        );
        Ok(())
    }

    async fn on_added(
        &self,
        client: &dyn OrchestratorClient,
        gs: GameServer,
    ) -> Result<GameServer, PluginError> {
        self.ensure_exposure(client, gs).await
    }

    async fn on_updated(
        &self,
        client: &dyn OrchestratorClient,
        gs: GameServer,
    ) -> Result<GameServer, PluginError> {
        let manager = NetworkManager::new(&gs);

        // No recorded status yet: report NotReady and stop.
        let Some(mut network_status) = manager.network_status()? else {
            return manager.update_network_status(NetworkStatus::not_ready());
        };

        let exposure = match client.get_exposure(gs.namespace(), gs.name()).await {
            Ok(exposure) => exposure,
            // Exposure vanished: re-create it and defer everything else.
            Err(e) if e.is_not_found() => return self.ensure_exposure(client, gs).await,
            Err(e) => return Err(e.into()),
        };

        // Desired disabled flag vs current exposure mode: flip and stop,
        // leaving status recomputation to the next invocation.
        let disabled = manager.network_disabled();
        if disabled && exposure.spec.mode == ExposureMode::LoadBalancer {
            let mut exposure = exposure;
            exposure.spec.mode = ExposureMode::ClusterIp;
            client.update_exposure(&exposure).await?;
            info!(game_server = %gs.name(), "disabled external exposure");
            return Ok(gs);
        }
        if !disabled && exposure.spec.mode == ExposureMode::ClusterIp {
            let mut exposure = exposure;
            exposure.spec.mode = ExposureMode::LoadBalancer;
            client.update_exposure(&exposure).await?;
            info!(game_server = %gs.name(), "enabled external exposure");
            return Ok(gs);
        }

        let state = status::derive_state(&exposure);
        if state == NetworkState::Ready {
            if let Some((internal, external)) =
                status::compute_address_pairs(gs.pod_ip(), &exposure)
            {
                network_status.internal_addresses = internal;
                network_status.external_addresses = external;
            }
        }
        network_status.transition(state);
        manager.update_network_status(network_status)
    }

    async fn on_deleted(
        &self,
        client: &dyn OrchestratorClient,
        gs: GameServer,
    ) -> Result<(), PluginError> {
        // A missing exposure is fatal here: without it the set of ports to
        // release cannot be recovered until the next full bootstrap.
        let exposure = client.get_exposure(gs.namespace(), gs.name()).await?;

        let lb_id = exposure
            .metadata
            .annotations
            .get(LB_ID_ANNOTATION)
            .cloned()
            .unwrap_or_default();
        for port in exposure.listener_ports() {
            self.allocator.deallocate(&lb_id, port).await;
        }

        info!(game_server = %gs.name(), lb_id = %lb_id, "released listener ports");
        Ok(())
    }
}

/// Ownership for the exposure: the instance itself, or its owning set under
/// fixed identity so the exposure survives instance replacement.
fn owner_reference_for(gs: &GameServer, fixed: bool) -> OwnerReference {
    if fixed {
        if let Some(set) = gs.owning_set() {
            return set.clone();
        }
    }
    gs.owner_reference()
}

/// Build the exposure object binding `ports` to the instance
fn build_exposure(gs: &GameServer, conf: &NetworkConf, ports: &[u16]) -> Exposure {
    let mut exposure = Exposure::new(gs.name(), gs.namespace())
        .with_annotation(OVERRIDE_LISTENERS_ANNOTATION, "true")
        .with_annotation(LB_ID_ANNOTATION, conf.lb_id.clone())
        .with_label(LB_ID_LABEL, conf.lb_id.clone());

    exposure.metadata.owner_references = vec![owner_reference_for(gs, conf.fixed)];
    exposure
        .spec
        .selector
        .insert(INSTANCE_SELECTOR_KEY.to_string(), gs.name().to_string());

    exposure.spec.ports = conf
        .target_ports
        .iter()
        .zip(conf.protocols.iter())
        .zip(ports.iter())
        .map(|((target_port, protocol), port)| ExposurePort {
            name: target_port.to_string(),
            port: *port,
            protocol: *protocol,
            target_port: *target_port,
        })
        .collect();

    exposure
}
