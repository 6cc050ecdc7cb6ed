use structopt::StructOpt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use wormhole::cli::Wormhole;
use wormhole::config::{ClientConfig, FileConfig};
use wormhole::defaults;
use wormhole::session::Session;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Wormhole::from_args();
    let proto = args.proto();
    let tunnel = args.tunnel();

    let file_config = match defaults::config::config_path() {
        Some(path) => FileConfig::load(&path).await.unwrap_or_else(|err| {
            tracing::warn!("failed to read config file: {}", err);
            FileConfig::default()
        }),
        None => FileConfig::default(),
    };

    let (address, with_metrics) = file_config.merge(tunnel.address.clone(), tunnel.metrics);

    let config = ClientConfig {
        proto,
        name: tunnel.name.clone(),
        target_address: tunnel.target_address.clone(),
        address,
        with_metrics,
        target_tls: tunnel.target_tls,
    };

    let shutdown = CancellationToken::new();
    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt, shutting down");
            shutdown_on_signal.cancel();
        }
    });

    let metrics_tx = if config.with_metrics {
        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Some(metrics) = rx.recv().await {
                tracing::info!(
                    ingress = metrics.ingress,
                    egress = metrics.egress,
                    uptime = metrics.uptime,
                    connections = metrics.connection_count,
                    active = metrics.active_connections,
                    "metrics"
                );
            }
        });
        Some(tx)
    } else {
        None
    };

    let session = Session::new(config);
    let result = session.run(shutdown, metrics_tx).await;

    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!("{}", err);
            err.exit_code()
        }
    });
}
