//! Follow realtime activity.

use std::time::Duration;

use digitrestau_client::AppController;
use tracing::{info, warn};

use super::Session;
use crate::output;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Keep the realtime channel open and print each new notification until
/// Ctrl-C.
pub async fn run(session: &Session) {
    let Some(supabase) = &session.supabase else {
        warn!("No remote backend configured, nothing to watch");
        return;
    };
    let channel = supabase.subscribe_orders();
    info!("Watching orders, press Ctrl-C to stop");

    follow(&session.controller, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
        }
    })
    .await;

    channel.close();
}

/// Print notifications newer than the ones already visible until `stop`
/// resolves.
async fn follow(controller: &AppController, stop: impl Future<Output = ()>) {
    let mut last_seen = controller
        .notifications()
        .latest()
        .map_or(0, |notification| notification.id);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            () = &mut stop => break,
            _ = ticker.tick() => {
                let fresh: Vec<_> = controller
                    .notifications()
                    .snapshot()
                    .into_iter()
                    .filter(|notification| notification.id > last_seen)
                    .collect();
                if let Some(newest) = fresh.last() {
                    last_seen = newest.id;
                    output::notifications(&fresh);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use digitrestau_client::{ClientConfig, Collaborators, MemoryStorage};

    use super::*;

    #[tokio::test]
    async fn test_follow_stops_between_ticks() {
        let controller = AppController::new(
            Collaborators::offline(Arc::new(MemoryStorage::new())),
            &ClientConfig::default(),
        );
        controller.notifications().info("Bienvenue !");

        let stopped = tokio::time::timeout(
            POLL_INTERVAL,
            follow(&controller, tokio::time::sleep(Duration::from_millis(20))),
        )
        .await;
        assert!(stopped.is_ok());
    }
}
