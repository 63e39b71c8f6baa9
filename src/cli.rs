use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::ProviderOptions;
use crate::plugin::PluginRegistry;

#[derive(Parser, Debug)]
#[command(name = "gamenet")]
#[command(about = "Pluggable network exposure for containerized game servers")]
#[command(version)]
pub struct Args {
    /// Path to the provider options file (YAML)
    #[arg(required = true)]
    pub options_file: PathBuf,

    /// Orchestration API endpoint
    #[arg(long, env = "GAMENET_API_ENDPOINT", default_value = "http://127.0.0.1:8181")]
    pub api_endpoint: String,

    /// Namespace to watch; all namespaces when omitted
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Network plugin to drive, by name or alias
    #[arg(long, default_value = crate::plugin::lb::LB_NETWORK_NAME)]
    pub provider: String,

    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Dry-run mode: validate options and show the registry without running
    #[arg(long)]
    pub dry_run: bool,

    /// Path to a .env file for loading provider credentials
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,
}

/// Format a dry-run summary of the registry and port range.
/// Pure function - returns a formatted string.
pub fn format_dry_run(registry: &PluginRegistry, options: &ProviderOptions, args: &Args) -> String {
    let mut output = String::new();

    output.push_str("gamenet - Dry Run Mode\n\n");
    output.push_str(&format!("Options: {}\n", args.options_file.display()));
    output.push_str(&format!(
        "Listener port range: [{}, {})\n",
        options.min_port, options.max_port
    ));
    output.push_str(&format!("API endpoint: {}\n\n", args.api_endpoint));

    let mut names = registry.names();
    names.sort_unstable();
    output.push_str(&format!("Registered plugins ({}):\n", names.len()));
    for name in names {
        let marker = if name == args.provider { " (selected)" } else { "" };
        output.push_str(&format!("  - {}{}\n", name, marker));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::CloudLbPlugin;
    use std::sync::Arc;

    #[test]
    fn test_format_dry_run() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(CloudLbPlugin::new())).unwrap();

        let options = ProviderOptions {
            min_port: 8000,
            max_port: 8100,
        };
        let args = Args::parse_from(["gamenet", "options.yaml"]);

        let output = format_dry_run(&registry, &options, &args);
        assert!(output.contains("[8000, 8100)"));
        assert!(output.contains("Cloud-LB (selected)"));
    }
}
