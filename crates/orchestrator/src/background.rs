//! Background session sweeper.
//!
//! Deployments without a running task scheduler can skip spawning this
//! entirely: stores evict lazily on access, so the sweeper only reclaims
//! memory held by sessions nobody asks about anymore.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use levelapp_state::SessionStore;

/// How often the sweeper evicts expired sessions.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Spawn the session sweeper. Returns the task handle and a shutdown sender;
/// dropping the sender or sending a unit stops the loop after the current
/// tick.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>) -> (JoinHandle<()>, mpsc::Sender<()>) {
    spawn_sweeper_with_interval(store, SWEEP_INTERVAL)
}

fn spawn_sweeper_with_interval(
    store: Arc<dyn SessionStore>,
    sweep_interval: Duration,
) -> (JoinHandle<()>, mpsc::Sender<()>) {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        // The first tick fires immediately; skip it so a fresh start doesn't
        // race session creation in tests.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("session sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    match store.delete_expired(Utc::now()).await {
                        Ok(0) => {}
                        Ok(evicted) => info!(evicted, "session sweep completed"),
                        Err(err) => error!(error = %err, "session sweep failed"),
                    }
                }
            }
        }
    });
    (handle, shutdown_tx)
}
