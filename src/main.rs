use std::time::Duration;

use clap::Parser;
use layerconf::bootstrap::bootstrap;
use layerconf::constants::ROOT_KEY;
use layerconf::CodecError;
use layerconf::Layer;
use layerconf::LayerView;
use layerconf::Result;
use layerconf::Settings;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::mpsc;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Print configuration values resolved through layered sources
#[derive(Debug, Parser)]
#[command(name = "layerconf", version, about)]
struct Cli {
    /// Bootstrap settings file (TOML or JSON)
    #[arg(long)]
    settings: Option<String>,

    /// Layer to resolve through, in priority order. Repeatable; defaults to
    /// the default layers.
    #[arg(long = "layer", value_name = "NAME")]
    layers: Vec<String>,

    /// Keep running and print the value again whenever it changes
    #[arg(long)]
    watch: bool,

    /// Dotted key path; the whole document when omitted
    key: Option<String>,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initializing Logs
    init_observability();

    let settings = Settings::load(cli.settings.as_deref())?;
    let ctx = bootstrap(&settings, None)?;

    let view = ctx.layer(&cli.layers);
    let key = cli.key.as_deref().unwrap_or(ROOT_KEY);
    print_value(&view, key)?;

    if cli.watch {
        // Reads drive time-based refresh of file layers
        let period = Duration::from_secs(settings.cache.cache_time_secs.max(1));
        watch_value(&view, key, period).await?;
    }

    ctx.shutdown();
    Ok(())
}

fn print_value(
    view: &LayerView,
    key: &str,
) -> Result<()> {
    match view.get(key) {
        Some(value) => {
            let text = serde_json::to_string_pretty(&value).map_err(CodecError::from)?;
            println!("{}", text);
        }
        None => warn!(key, "no value found"),
    }
    Ok(())
}

async fn watch_value(
    view: &LayerView,
    key: &str,
    period: Duration,
) -> Result<()> {
    let (notifier, mut changes) = mpsc::channel(1);
    view.watch(notifier);

    let mut ticker = tokio::time::interval(period);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(key, "Watching for changes. Waiting for CTRL+C signal...");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown completed");
                return Ok(());
            }
            Some(()) = changes.recv() => print_value(view, key)?,
            _ = ticker.tick() => {
                let _ = view.get(key);
            }
        }
    }
}

async fn shutdown_signal() {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
        _ = terminate => {
            info!("SIGTERM detected.");
        },
    }
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
