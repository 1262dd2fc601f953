//! CLI command definitions and argument parsing

use clap::Parser;
use clap::Subcommand;

use crate::api::server::build_state;
use crate::config::AppConfig;
use crate::remote::Disposition;
use crate::Result;

#[derive(Parser)]
#[command(name = "lorabridge")]
#[command(about = "Remote LoRA metadata bridge for node-editor workflows")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway server (proxy + local event routes)
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Bind port
        #[arg(long, default_value_t = 9188)]
        port: u16,
    },
    /// Check remote connectivity and print gateway status
    Status,
    /// Print the proxy route table
    Routes,
}

/// Handle the `status` command.
pub async fn handle_status_command(config: AppConfig) -> Result<()> {
    if !config.is_configured() {
        println!("Remote: not configured (set remote.url or LORABRIDGE_REMOTE_URL)");
        return Ok(());
    }
    let remote_url = config.remote.url.clone();
    println!("Remote: {remote_url}");

    let state = build_state(config)?;
    match state.client.lora_list().await {
        Ok(list) => {
            println!(
                "Reachable: yes ({} loras{})",
                list.value.len(),
                if list.is_stale() { ", stale" } else { "" }
            );
            match state.client.checkpoint_list().await {
                Ok(checkpoints) => println!("Checkpoints: {}", checkpoints.value.len()),
                Err(err) => println!("Checkpoints: unavailable ({err})"),
            }
        }
        Err(err) => println!("Reachable: no ({err})"),
    }
    Ok(())
}

/// Handle the `routes` command.
pub fn handle_routes_command(config: &AppConfig) {
    let state_note = if config.is_configured() {
        "forwarding enabled"
    } else {
        "forwarding disabled: no remote_url"
    };
    println!("Route table ({state_note}):");

    let table = crate::remote::RouteTable::lora_manager_defaults();
    for rule in table.rules() {
        let pattern = match &rule.pattern {
            crate::remote::RoutePattern::Exact(path) => path.clone(),
            crate::remote::RoutePattern::Prefix(prefix) => format!("{prefix}*"),
        };
        let disposition = match rule.disposition {
            Disposition::Forward => "forward".to_string(),
            Disposition::LocalHandle(action) => format!("local ({action:?})"),
        };
        println!("  {pattern:<40} {disposition}");
    }

    if !config.remote.path_mappings.is_empty() {
        println!("Path mappings:");
        for mapping in &config.remote.path_mappings {
            println!("  {} -> {}", mapping.remote_prefix, mapping.local_prefix);
        }
    }
}
