//! X-Air remote
//!
//! Mirrors a Behringer X-Air mixer on an X-Touch control surface over OSC.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xair_remote::config::AppConfig;
use xair_remote::mixer::{read_initial_state, MixerActor, DEFAULT_BUS};
use xair_remote::osc::{discover, XAirClient};
use xair_remote::surface::xtouch::{forward_input, XTouchInput};
use xair_remote::surface::{spawn_watchdog, ConsoleSurface, ControlSurface, XTouchSurface};

/// Remote control an X-Air mixer from an X-Touch
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Mixer IP address (skips discovery)
    xair_address: Option<String>,

    /// Shut down when the control surface disconnects
    #[arg(short, long)]
    monitor: bool,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    debug: bool,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(if args.debug { "debug" } else { &args.log_level })?;

    info!("Starting X-Air remote v{}...", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => {
            info!("Configuration file: {}", path);
            AppConfig::load(path).await?
        }
        None => AppConfig::default(),
    };

    let result = run_app(&args, config).await;
    if let Err(e) = &result {
        error!("❌ {:#}", e);
    }
    result
}

async fn run_app(args: &Args, config: AppConfig) -> Result<()> {
    let mixer_config = &config.mixer;
    let ip = resolve_mixer_address(args, &config).await?;

    // Control surface: X-Touch when configured, log-only otherwise
    let mut surface_input = None;
    let mut _input_guard: Option<XTouchInput> = None;
    let surface: Arc<dyn ControlSurface> = match &config.surface {
        Some(surface_config) => {
            let (surface, guard, rx) = XTouchSurface::connect(surface_config)
                .await
                .context("Failed to connect to the control surface")?;
            surface_input = Some(rx);
            _input_guard = Some(guard);
            Arc::new(surface)
        }
        None => {
            info!("No control surface configured, logging indicator updates");
            Arc::new(ConsoleSurface::new("console"))
        }
    };

    let client = Arc::new(
        XAirClient::connect(ip, mixer_config.port)
            .await
            .with_context(|| format!("Failed to open OSC socket to {}", ip))?,
    );

    let mixer = MixerActor::spawn(client.clone(), surface.clone());
    if let Some(rx) = surface_input {
        tokio::spawn(forward_input(rx, mixer.clone()));
    }

    let shutdown = CancellationToken::new();
    let receiver = client.spawn_receiver(mixer.clone(), shutdown.clone());

    if let Err(e) = client.validate(mixer_config.validate_timeout()).await {
        shutdown.cancel();
        mixer.shutdown();
        return Err(e.into());
    }

    let monitor = args.monitor || config.surface.as_ref().is_some_and(|s| s.monitor);
    let watchdog = monitor.then(|| spawn_watchdog(surface.clone(), shutdown.clone()));

    read_initial_state(&mixer, client.as_ref(), mixer_config.replay_delay()).await;
    mixer.select_bank(0);
    mixer.select_bus(DEFAULT_BUS);

    tokio::spawn(shutdown_signal(shutdown.clone()));

    info!("✅ Ready, press Ctrl+C to quit");
    client
        .keepalive(mixer_config.keepalive_interval(), shutdown.clone())
        .await;

    // Keepalive returns once the token is cancelled
    mixer.shutdown();
    if let Err(e) = receiver.await {
        warn!("OSC receiver task failed: {}", e);
    }

    // A surface disconnect ends the process with an error
    if let Some(watchdog) = watchdog {
        watchdog
            .await
            .context("Surface watchdog task failed")?
            .context("Control surface disconnected")?;
    }

    info!("X-Air remote shutdown complete");
    Ok(())
}

/// CLI argument, then configuration, then a discovery broadcast
async fn resolve_mixer_address(args: &Args, config: &AppConfig) -> Result<IpAddr> {
    if let Some(address) = &args.xair_address {
        return address
            .parse()
            .with_context(|| format!("Invalid mixer address: {}", address));
    }
    if let Some(ip) = config.mixer_address() {
        return Ok(ip);
    }

    let mixer = discover(config.mixer.port, config.mixer.discovery_timeout()).await?;
    mixer
        .ip_addr()
        .with_context(|| format!("Mixer reported an invalid IP address: {}", mixer.ip))
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        },
        _ = shutdown.cancelled() => {}
    }
}
