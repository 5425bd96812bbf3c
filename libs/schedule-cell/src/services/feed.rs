// libs/schedule-cell/src/services/feed.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::ChangeEvent;

pub type FeedSender = broadcast::Sender<ChangeEvent>;
pub type FeedReceiver = broadcast::Receiver<ChangeEvent>;

const CHANNEL_CAPACITY: usize = 100;

/// Fans backend row-change notifications out to per-clinic subscribers.
/// Subscribers never receive diffs to apply; an event only means "refetch
/// your snapshot".
pub struct ChangeFeedHub {
    channels: Arc<RwLock<HashMap<Uuid, FeedSender>>>,
}

impl ChangeFeedHub {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn subscribe(&self, clinic_id: Uuid) -> FeedReceiver {
        let mut channels = self.channels.write().await;
        channels
            .entry(clinic_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Deliver an event to a clinic's subscribers. Returns how many live
    /// receivers saw it; zero when nobody is listening.
    pub async fn publish(&self, clinic_id: Uuid, event: ChangeEvent) -> usize {
        let channels = self.channels.read().await;
        match channels.get(&clinic_id) {
            Some(sender) => sender.send(event).unwrap_or_else(|_| {
                debug!("No live feed subscribers for clinic {}", clinic_id);
                0
            }),
            None => 0,
        }
    }
}

impl Default for ChangeFeedHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ChangeFeedHub {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeKind;
    use serde_json::json;

    fn insert_event(clinic_id: Uuid) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Insert,
            table: "appointments".to_string(),
            record: Some(json!({"clinic_id": clinic_id})),
            old_record: None,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = ChangeFeedHub::new();
        let clinic = Uuid::new_v4();

        let mut rx = hub.subscribe(clinic).await;
        let delivered = hub.publish(clinic, insert_event(clinic)).await;
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.clinic_id(), Some(clinic));
    }

    #[tokio::test]
    async fn events_do_not_cross_clinics() {
        let hub = ChangeFeedHub::new();
        let clinic_a = Uuid::new_v4();
        let clinic_b = Uuid::new_v4();

        let mut rx_a = hub.subscribe(clinic_a).await;
        let _rx_b = hub.subscribe(clinic_b).await;

        hub.publish(clinic_b, insert_event(clinic_b)).await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let hub = ChangeFeedHub::new();
        let clinic = Uuid::new_v4();
        assert_eq!(hub.publish(clinic, insert_event(clinic)).await, 0);
    }
}
