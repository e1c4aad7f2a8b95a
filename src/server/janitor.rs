// File: ./src/server/janitor.rs
// Periodic removal of expired lists.
use crate::service::ListService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub fn spawn(service: Arc<ListService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_once(&service).await;
        }
    })
}

pub async fn run_once(service: &Arc<ListService>) -> usize {
    let svc = service.clone();
    match tokio::task::spawn_blocking(move || svc.purge_expired()).await {
        Ok(Ok(0)) => {
            tracing::debug!("expiry sweep found nothing");
            0
        }
        Ok(Ok(removed)) => {
            tracing::info!(removed, "purged expired lists");
            removed
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "expiry sweep failed");
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "expiry sweep task failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreateListRequest;
    use crate::service::ServiceSettings;
    use crate::store::MemoryStore;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    #[tokio::test]
    async fn run_once_removes_only_expired_lists() {
        let offset = Arc::new(AtomicI64::new(0));
        let o = offset.clone();
        let base = Utc::now();
        let service = Arc::new(
            ListService::new(Arc::new(MemoryStore::new()), ServiceSettings::default())
                .with_clock(move || base + ChronoDuration::hours(o.load(Ordering::SeqCst))),
        );
        service
            .create(CreateListRequest {
                expiration_hours: 1,
                ..Default::default()
            })
            .unwrap();
        let keep = service
            .create(CreateListRequest {
                expiration_hours: 48,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(run_once(&service).await, 0);
        offset.store(2, Ordering::SeqCst);
        assert_eq!(run_once(&service).await, 1);
        assert!(service.get(&keep.id).is_ok());
    }
}
