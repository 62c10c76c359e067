mod node;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};

use kdisc_core::{logging, PeerAddressResolver, ResolverContext, Settings};
use kdisc_kubernetes::{KubernetesApiClient, KubernetesDiscoveryPlugin};

use node::StaticNode;

#[derive(Parser)]
#[command(name = "kdisc", version, about = "Kubernetes peer discovery for cluster nodes")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON); `KDISC_*` variables override it
    #[arg(short, long, env = "KDISC_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the options the Kubernetes backend registers
    Options,
    /// Report whether Kubernetes discovery is active for the loaded settings
    Check,
    /// Build the peer resolver the way a host would and resolve peers once
    Resolve {
        /// Transport port peers listen on
        #[arg(long, default_value_t = 9300)]
        transport_port: u16,
        /// This node's address, left out of the result
        #[arg(long)]
        publish_host: Option<IpAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    // 2. Initialize logging
    logging::init_logging(&settings.logging()?)?;

    let plugin = KubernetesDiscoveryPlugin::<KubernetesApiClient>::new(settings);

    let outcome = match cli.command {
        Command::Options => {
            for option in plugin.declared_options() {
                println!(
                    "{:<36} {:<9} default={:<5} required={}",
                    option.key,
                    option.kind,
                    option.default.unwrap_or("-"),
                    option.required
                );
            }
            Ok(())
        }
        Command::Check => {
            let active = plugin.is_active()?;
            println!("kubernetes discovery active: {active}");
            Ok(())
        }
        Command::Resolve {
            transport_port,
            publish_host,
        } => resolve(&plugin, transport_port, publish_host).await,
    };

    // 3. Release the registry client, whatever happened above
    plugin.shutdown().context("Failed to release registry client")?;
    outcome
}

async fn resolve(
    plugin: &KubernetesDiscoveryPlugin<KubernetesApiClient>,
    transport_port: u16,
    publish_host: Option<IpAddr>,
) -> Result<()> {
    let node = Arc::new(StaticNode {
        transport_port,
        publish_host,
    });
    let ctx = ResolverContext {
        transport: node.clone(),
        network: node,
    };

    let Some(factory) = plugin.offer_resolver_factory(&ctx)? else {
        warn!("Kubernetes discovery is not active, nothing to resolve");
        return Ok(());
    };

    let resolver = factory.invoke()?;
    info!(
        endpoints_url = %resolver.client().endpoints_url(),
        "Resolving peers"
    );

    let peers = resolver.resolve_peers().await?;
    for peer in &peers {
        println!("{peer}");
    }
    info!(peer_count = peers.len(), "Peer resolution completed");
    Ok(())
}
