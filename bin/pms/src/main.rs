use std::{collections::HashMap, sync::Arc};

use clap::Parser;
use pms_config::Cli;
use pms_core::{NetworkSupervisor, TickEngine};
use pms_metrics::NetworkMetrics;
use pms_net::{PeerAdapter, RpcP2pClientAdapter};
use pms_state::NetworkState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = pms_config::load(&cli)?;

    let mut engines = Vec::with_capacity(config.networks.len());
    for (network_name, network_config) in &config.networks {
        let metrics = NetworkMetrics::new(network_name.clone());
        let mut adapters: HashMap<String, Arc<dyn PeerAdapter>> = HashMap::with_capacity(network_config.nodes.len());
        for (node_name, node_config) in &network_config.nodes {
            let adapter = RpcP2pClientAdapter::connect(
                node_name.clone(),
                &node_config.rpc_address,
                config.rpc_timeout,
                metrics.clone()
            )?;
            adapters.insert(node_name.clone(), Arc::new(adapter));
        }

        engines.push(TickEngine::new(
            network_name.clone(),
            network_config.clone(),
            adapters,
            Arc::new(NetworkState::new()),
            metrics,
            config.node_state_expiration,
            config.dry_run
        ));
    }

    let mut supervisor = NetworkSupervisor::new(config.poll_interval);
    supervisor.start(engines);

    tracing::info!(networks = config.networks.len(), dry_run = config.dry_run, "peer mesh manager started");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    supervisor.shutdown();
    supervisor.join_all().await;

    Ok(())
}
