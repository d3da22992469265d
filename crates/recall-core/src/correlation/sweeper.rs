//! Background task abandoning expired correlation cache entries.

use std::time::Duration;

use recall_types::spans::SPAN_SWEEP;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cache::CorrelationCache;

/// Periodically sweep `cache` until `cancel` fires.
///
/// Each tick removes entries older than the cache's TTL. The first sweep
/// happens one `interval` after spawning.
pub fn spawn_sweeper(
    cache: CorrelationCache,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Correlation cache sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let abandoned =
                        tracing::info_span!(SPAN_SWEEP).in_scope(|| cache.sweep_expired());
                    if !abandoned.is_empty() {
                        let turn_ids: Vec<String> =
                            abandoned.iter().map(|(id, _)| id.to_string()).collect();
                        info!(
                            count = abandoned.len(),
                            turn_ids = ?turn_ids,
                            remaining = cache.len(),
                            "Abandoned unpaired user turns"
                        );
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::cache::EvictionPolicy;
    use recall_types::classification::ClassificationId;
    use recall_types::turn::TurnId;

    #[tokio::test]
    async fn sweeper_abandons_expired_entries() {
        let cache = CorrelationCache::new(EvictionPolicy {
            ttl: Some(Duration::from_millis(1)),
            max_entries: None,
        });
        cache.put(TurnId::from("u1"), ClassificationId(0));

        let cancel = CancellationToken::new();
        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(10), cancel.clone());

        for _ in 0..100 {
            if cache.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(cache.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancel() {
        let cache = CorrelationCache::default();
        let cancel = CancellationToken::new();
        let handle = spawn_sweeper(cache, Duration::from_secs(3600), cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn sweeper_keeps_fresh_entries() {
        let cache = CorrelationCache::default();
        cache.put(TurnId::from("u1"), ClassificationId(0));

        let cancel = CancellationToken::new();
        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(5), cancel.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(cache.contains(&TurnId::from("u1")));
    }
}
