//! Site routing engine.
//!
//! Loads a configuration tree, keeps the routing model built from it up to
//! date, and serves a diagnostics API over the published model.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use site_routing::admin::handlers::model_status;
use site_routing::cache::{spawn_invalidator, ModelCache};
use site_routing::config::{load_config, EngineConfig};
use site_routing::http::DiagnosticsServer;
use site_routing::lifecycle::{handle_signals, Shutdown};
use site_routing::observability::{logging, metrics};
use site_routing::source::file::load_source;
use site_routing::source::watcher::SourceWatcher;

#[derive(Debug, Parser)]
#[command(name = "site-routing", version, about = "Cached site routing model with a diagnostics API")]
struct Args {
    /// Engine configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration tree document, overriding `source.path`.
    #[arg(short, long)]
    tree: Option<PathBuf>,

    /// Build the model once, print its status as JSON and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(tree) = &args.tree {
        config.source.path = tree.display().to_string();
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "site-routing starting");
    tracing::info!(
        tree = %config.source.path,
        watch = config.source.watch,
        server = config.server.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(address) => metrics::init_metrics(address)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let tree_path = PathBuf::from(&config.source.path);
    let source = Arc::new(load_source(&tree_path)?);
    let cache = Arc::new(ModelCache::new(source.clone()));

    if args.check {
        let built = cache.clone();
        let model = tokio::task::spawn_blocking(move || built.get_virtual_hosts()).await??;
        tracing::info!(
            hosts = model.hosts().count(),
            sites = model.sites().len(),
            unavailable = model.unavailable_roots().len(),
            "Model built"
        );
        println!("{}", serde_json::to_string_pretty(&model_status(&cache, &model))?);
        return Ok(());
    }

    let shutdown = Shutdown::new();
    let invalidator = spawn_invalidator(
        cache.clone(),
        source.subscribe(),
        config.model.max_batch_paths,
        shutdown.subscribe(),
    );

    if config.model.eager_build {
        let built = cache.clone();
        match tokio::task::spawn_blocking(move || built.get_virtual_hosts()).await? {
            Ok(model) => tracing::info!(generation = model.generation(), sites = model.sites().len(), "Initial model built"),
            Err(error) => tracing::warn!(error = %error, "Initial model build failed, retrying on first request"),
        }
    }

    let _watcher = if config.source.watch {
        let watcher = SourceWatcher::new(
            &tree_path,
            source.clone(),
            Duration::from_secs(config.source.poll_interval_secs),
        );
        Some(watcher.run()?)
    } else {
        None
    };

    let server = if config.server.enabled {
        let listener = TcpListener::bind(&config.server.bind_address).await?;
        let server = DiagnosticsServer::new(cache.clone(), &config.server);
        let stop = shutdown.subscribe();
        Some(tokio::spawn(server.run(listener, stop)))
    } else {
        None
    };

    handle_signals(cache, shutdown.clone()).await;

    if let Some(server) = server {
        if let Err(error) = server.await? {
            tracing::error!(error = %error, "Diagnostics server failed");
        }
    }
    invalidator.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
