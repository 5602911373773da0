use anyhow::{Context, Result};
use clap::Parser;
use hostcrab::dns::forwarder::UdpForwarder;
use hostcrab::{logger, Config, Handler, HostTable, ShutdownCoordinator};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Answer A queries from hosts.json, forward everything else upstream.
#[derive(Parser)]
#[command(name = "hostcrab", version)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    Cli::parse();
    tracing_init();

    let config = Arc::new(Config::from_env()?);
    let hosts = HostTable::try_from_file(&config.hosts_path)
        .with_context(|| format!("Error loading hosts file {}", config.hosts_path.display()))?;
    tracing::debug!("loaded {} hosts from {}", hosts.len(), config.hosts_path.display());

    let (log, log_consumer) = logger::spawn(config.log_queue_capacity);
    let upstream = Arc::new(UdpForwarder::new(
        config.upstream_addr,
        config.upstream_timeout,
    ));
    let handler = Handler::new(Arc::new(hosts), upstream, log);

    let shutdown = ShutdownCoordinator::new();
    let dns_server = hostcrab::new_dns(&config, handler, &shutdown).await?;
    tracing::info!("DNS listening on UDP {}", dns_server.local_addr()?);
    if let Some(limit) = config.max_in_flight {
        tracing::info!("handling at most {limit} requests concurrently");
    }

    tokio::spawn(shutdown.clone().wait_for_signal());
    dns_server.block_until_done().await;
    shutdown.drain().await;

    // Every handler clone is gone now, so the consumer stops after the queue drains.
    log_consumer.await??;
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostcrab=info".into()),
        )
        .init();
}
