use std::process;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gamenet::api::{GameServer, HttpClient, WatchEvent, WatchEventType};
use gamenet::cli::{format_dry_run, Args};
use gamenet::config::load_provider_options;
use gamenet::plugin::{CloudLbPlugin, NetworkPlugin, PluginRegistry};
use gamenet::OrchestratorClient;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Load .env file if specified
    if let Some(ref env_file) = args.env_file {
        if let Err(e) = dotenvy::from_path(env_file) {
            error!("Failed to load env file {}: {}", env_file.display(), e);
            process::exit(1);
        }
    }

    // Load and validate provider options
    let options = match load_provider_options(&args.options_file) {
        Ok(options) => options,
        Err(e) => {
            error!(
                "Failed to load options file {}: {}",
                args.options_file.display(),
                e
            );
            process::exit(1);
        }
    };

    // Build the registry explicitly; no import-time side effects.
    let mut registry = PluginRegistry::new();
    if let Err(e) = registry.register(Arc::new(CloudLbPlugin::new())) {
        error!("Failed to register plugin: {}", e);
        process::exit(1);
    }

    // Dry-run mode: print the registry and exit
    if args.dry_run {
        let output = format_dry_run(&registry, &options, &args);
        println!("{}", output);
        return;
    }

    let Some(plugin) = registry.get(&args.provider) else {
        error!("Unknown network plugin: {}", args.provider);
        process::exit(1);
    };

    let client: Arc<dyn OrchestratorClient> = Arc::new(HttpClient::new(args.api_endpoint.clone()));

    info!("Initializing plugin {} ({})", plugin.name(), plugin.alias());
    if let Err(e) = plugin.init(client.as_ref(), &options).await {
        error!("Plugin init failed: {}", e);
        process::exit(1);
    }

    info!(
        "Watching game servers in {}",
        args.namespace.as_deref().unwrap_or("all namespaces")
    );
    let mut events = match client.watch_game_servers(args.namespace.as_deref()).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to start watch: {}", e);
            process::exit(1);
        }
    };

    // Stand-in for the host reconciler's worker pool: one task per event,
    // no ordering guarantee between distinct instances.
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                let client = client.clone();
                let plugin = plugin.clone();
                tokio::spawn(handle_event(client, plugin, event));
            }
            Err(e) => warn!("Watch stream error: {}", e),
        }
    }

    info!("Watch stream closed, shutting down");
}

/// Dispatch one watch event to the plugin and persist any instance changes.
/// Hook errors are logged and dropped: idempotent re-invocation on the next
/// event is the retry mechanism.
async fn handle_event(
    client: Arc<dyn OrchestratorClient>,
    plugin: Arc<dyn NetworkPlugin>,
    event: WatchEvent<GameServer>,
) {
    let namespace = event.object.namespace().to_string();
    let name = event.object.name().to_string();
    let annotations_before = event.object.metadata.annotations.clone();

    let result = match event.event_type {
        WatchEventType::Added => plugin.on_added(client.as_ref(), event.object).await.map(Some),
        WatchEventType::Modified => plugin
            .on_updated(client.as_ref(), event.object)
            .await
            .map(Some),
        WatchEventType::Deleted => plugin
            .on_deleted(client.as_ref(), event.object)
            .await
            .map(|_| None),
    };

    match result {
        // Persist only when the hook actually changed the instance, so a
        // steady-state Modified event does not feed back into the watch.
        Ok(Some(updated)) if updated.metadata.annotations != annotations_before => {
            if let Err(e) = client.update_game_server(&updated).await {
                warn!(
                    game_server = %format!("{}/{}", namespace, name),
                    "Failed to persist instance update: {}", e
                );
            }
        }
        Ok(_) => {}
        Err(e) => warn!(
            game_server = %format!("{}/{}", namespace, name),
            kind = ?e.kind(),
            "Lifecycle hook failed, will retry on next event: {}", e
        ),
    }
}
