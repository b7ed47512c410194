use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::router::NotificationRouter;

/// Drive the router's ping probe on a fixed interval until shutdown.
///
/// Each tick probes allocations whose clients have been silent longer than
/// the configured inactive limit allows; with a zero limit the ticks are
/// no-ops.
pub fn spawn_ping_loop(
    router: Arc<NotificationRouter>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("ping loop shutting down");
                    break;
                }
                _ = ticker.tick() => router.ping(),
            }
        }
    })
}
