// libs/settings-cell/src/services/theme.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Branding, ThemeEvent};

pub type ThemeSender = broadcast::Sender<ThemeEvent>;
pub type ThemeReceiver = broadcast::Receiver<ThemeEvent>;

const CHANNEL_CAPACITY: usize = 16;

/// Process-wide snapshot of each account's branding plus the channel that
/// announces invalidations. Reads go through the snapshot; a profile save
/// evicts the entry and notifies subscribers, who refetch instead of
/// patching copies they hold.
pub struct ThemeCache {
    entries: Arc<RwLock<HashMap<Uuid, Branding>>>,
    events: ThemeSender,
}

impl ThemeCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Option<Branding> {
        let entries = self.entries.read().await;
        entries.get(&user_id).cloned()
    }

    pub async fn put(&self, user_id: Uuid, branding: Branding) {
        let mut entries = self.entries.write().await;
        entries.insert(user_id, branding);
    }

    /// Drop the cached blob and tell every listener. Returns how many live
    /// receivers saw the event; zero when nobody is subscribed.
    pub async fn invalidate(&self, user_id: Uuid) -> usize {
        {
            let mut entries = self.entries.write().await;
            if entries.remove(&user_id).is_some() {
                debug!("Evicted cached branding for user {}", user_id);
            }
        }
        self.events.send(ThemeEvent { user_id }).unwrap_or(0)
    }

    pub fn subscribe(&self) -> ThemeReceiver {
        self.events.subscribe()
    }
}

impl Default for ThemeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ThemeCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            events: self.events.clone(),
        }
    }
}
