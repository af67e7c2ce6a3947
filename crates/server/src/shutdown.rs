//! Graceful shutdown: drain the session registry, close the protocol
//! server, and bound the whole sequence with a watchdog.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use mcp::{ProtocolServer, SessionRegistry};
use tokio_util::sync::CancellationToken;

/// How long the shutdown sequence may take before the process is terminated
/// with a failure status, stuck connections notwithstanding.
const WATCHDOG_GRACE: Duration = Duration::from_secs(10);

/// Owns process-wide teardown of the transport state.
pub(crate) struct LifecycleCoordinator {
    registry: Arc<SessionRegistry>,
    protocol: Option<Arc<dyn ProtocolServer>>,
}

impl LifecycleCoordinator {
    pub(crate) fn new(registry: Arc<SessionRegistry>, protocol: Option<Arc<dyn ProtocolServer>>) -> Self {
        Self { registry, protocol }
    }

    /// Closes every registered session, clears the registry, and closes the
    /// protocol server. Every step is best-effort: a failure is logged and
    /// never aborts the remaining steps.
    pub(crate) async fn drain(&self) {
        let sessions = self.registry.snapshot();

        log::info!("Shutting down, closing {} open session(s)", sessions.len());

        join_all(sessions.iter().map(|session| session.close())).await;

        self.registry.clear();

        if let Some(protocol) = &self.protocol
            && let Err(e) = protocol.close().await
        {
            log::error!("Failed to close the MCP server: {e}");
        }
    }
}

/// Resolves once the shutdown sequence has run; axum then stops accepting,
/// closes the listener and finishes the in-flight connections, all of which
/// are already terminating because their sessions were closed in the drain.
pub(crate) async fn graceful(coordinator: LifecycleCoordinator, trigger: Option<CancellationToken>) {
    match trigger {
        Some(token) => token.cancelled().await,
        None => termination_signal().await,
    }

    log::info!("Shutdown signal received");

    arm_watchdog(WATCHDOG_GRACE);

    coordinator.drain().await;
}

/// Completes on the first SIGINT or SIGTERM. Further signals during the
/// shutdown sequence are absorbed and have no additional effect.
async fn termination_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for the interrupt signal: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install the SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}

fn arm_watchdog(grace: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        log::error!("Shutdown did not complete within {}s, terminating", grace.as_secs());
        std::process::exit(1);
    });
}
