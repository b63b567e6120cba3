//! Caesar Relay Server
//!
//! Accepts rotated wire connections, dials the fixed upstream relay
//! endpoint, and reverse-rotates toward the upstream / forward-rotates
//! toward the wire, restoring the stream for the upstream.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;

use caesar_relay::{
    config::Config,
    engine,
    negotiate::{Negotiator, UpstreamNegotiator},
    shutdown::{Coordinator, EventSender, ShutdownKind},
    status::StatusReporter,
    transform::TransformPair,
};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// Caesar Relay Server - rotation-obfuscated forwarding proxy
#[derive(Parser, Debug)]
#[command(name = "caesar-server")]
#[command(about = "Caesar Relay Server - rotation-obfuscated forwarding proxy")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Wire listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Upstream relay endpoint (overrides config)
    #[arg(short, long)]
    upstream: Option<String>,

    /// Rotation amount (overrides config)
    #[arg(short, long)]
    rotation: Option<u8>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_level))
        .init();

    // Load configuration
    let config = Config::load(&args.config).context("Failed to load configuration")?;
    let server_config = config
        .server
        .clone()
        .ok_or_else(|| anyhow!("No [server] section in config file"))?;

    let listen = match args.listen {
        Some(addr) => vec![addr],
        None => server_config.listen.clone(),
    };
    if listen.is_empty() {
        return Err(anyhow!("No listen address configured"));
    }
    let upstream = args.upstream.unwrap_or_else(|| server_config.upstream.clone());
    let rotation = args.rotation.unwrap_or(server_config.rotation);

    info!("Caesar Relay Server v{}", caesar_relay::VERSION);
    info!(rotation, %upstream, "transform configured");

    let (mut coordinator, events) = Coordinator::new();
    let negotiator: Arc<dyn Negotiator> = Arc::new(UpstreamNegotiator::new(
        upstream,
        server_config.connect_timeout(),
    ));
    let reporter = StatusReporter::new();

    // Each address is an independent method: a failed bind must not
    // prevent the others from serving.
    let mut bound = 0usize;
    for addr in &listen {
        match engine::start_listener(
            addr,
            Arc::clone(&negotiator),
            TransformPair::responder(rotation),
            events.clone(),
        )
        .await
        {
            Ok(listener) => {
                info!(addr = %listener.local_addr(), "wire listener started");
                reporter.method_ok("caesar", listener.local_addr());
                coordinator.register_listener(listener);
                bound += 1;
            }
            Err(err) => {
                warn!(addr = %addr, error = %err, "listener failed to start");
                reporter.method_error("caesar", &format!("{}: {}", addr, err));
            }
        }
    }
    reporter.methods_done();

    if bound == 0 {
        return Err(anyhow!("No listener could be started"));
    }

    spawn_signal_task(events.clone())?;

    let summary = coordinator.run().await;
    if summary.drained() {
        info!("shutdown complete");
    } else {
        warn!(
            abandoned = summary.abandoned_handlers,
            "exited with connections still in flight"
        );
    }

    Ok(())
}

/// Translate process signals into shutdown events: SIGINT drains, SIGTERM
/// stops now. A second SIGINT is another graceful request, which the
/// coordinator treats as termination.
fn spawn_signal_task(events: EventSender) -> Result<()> {
    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = interrupt.recv() => {
                    info!("interrupt received, draining");
                    events.request_shutdown(ShutdownKind::Graceful);
                }
                _ = terminate.recv() => {
                    info!("terminate received, stopping now");
                    events.request_shutdown(ShutdownKind::Immediate);
                }
            }
        }
    });

    Ok(())
}
