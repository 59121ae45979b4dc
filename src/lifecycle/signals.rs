//! OS signal handling.
//!
//! # Design Decisions
//! - SIGTERM and SIGINT trigger a graceful shutdown
//! - SIGHUP forces a model refresh instead of a restart
//! - On non-unix targets only Ctrl-C is observed

use std::sync::Arc;

use crate::cache::ModelCache;
use crate::lifecycle::shutdown::Shutdown;

/// Wait for OS signals until a shutdown signal arrives, then trigger
/// `shutdown`.
pub async fn handle_signals(cache: Arc<ModelCache>, shutdown: Shutdown) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let streams = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        );
        let (mut term, mut int, mut hup) = match streams {
            (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
            _ => {
                tracing::warn!("Failed to register signal handlers, falling back to Ctrl-C");
                wait_for_ctrl_c().await;
                shutdown.trigger();
                return;
            }
        };

        loop {
            tokio::select! {
                _ = term.recv() => {
                    tracing::info!(signal = "SIGTERM", "Shutdown requested");
                    break;
                }
                _ = int.recv() => {
                    tracing::info!(signal = "SIGINT", "Shutdown requested");
                    break;
                }
                _ = hup.recv() => {
                    tracing::info!(signal = "SIGHUP", "Forcing model refresh");
                    let cache = cache.clone();
                    match tokio::task::spawn_blocking(move || cache.get_virtual_hosts_fresh()).await {
                        Ok(Ok(model)) => tracing::info!(generation = model.generation(), "Model refreshed"),
                        Ok(Err(error)) => tracing::warn!(error = %error, "Forced refresh failed"),
                        Err(error) => tracing::error!(error = %error, "Refresh task panicked"),
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = cache;
        wait_for_ctrl_c().await;
        tracing::info!(signal = "ctrl-c", "Shutdown requested");
    }

    shutdown.trigger();
}

async fn wait_for_ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to listen for Ctrl-C");
    }
}
