use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::hub::{Hub, SubscriberId, Subscription};
use crate::{HubConfig, HubError};

/// Wire envelope for everything a hub sends out.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub event: &'a str,
    pub data: T,
}

/// Live hubs keyed by game id. Hubs are created on first use and removed
/// once retired and empty.
pub struct HubRegistry {
    hubs: DashMap<u32, Hub>,
    config: HubConfig,
}

impl HubRegistry {
    pub fn new(config: HubConfig) -> Self {
        Self {
            hubs: DashMap::new(),
            config,
        }
    }

    pub fn get_or_create(&self, game_id: u32) -> Hub {
        self.hubs
            .entry(game_id)
            .or_insert_with(|| Hub::spawn(game_id, &self.config))
            .clone()
    }

    pub fn get(&self, game_id: u32) -> Option<Hub> {
        self.hubs.get(&game_id).map(|hub| hub.clone())
    }

    /// Forgets a hub. Its task stops once the last handle is dropped, which
    /// closes every subscriber queue.
    pub fn remove(&self, game_id: u32) -> Option<Hub> {
        self.hubs.remove(&game_id).map(|(_, hub)| hub)
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    /// Marks a finished game's hub for removal, removing it right away when
    /// nobody is subscribed.
    pub fn retire(&self, game_id: u32) {
        let Some(hub) = self.get(game_id) else {
            return;
        };
        hub.retire();
        info!(game_id, subscribers = hub.subscriber_count(), "hub retired");
        self.remove_if_idle(game_id);
    }

    fn remove_if_idle(&self, game_id: u32) {
        let removed = self
            .hubs
            .remove_if(&game_id, |_, hub| {
                hub.is_retired() && hub.subscriber_count() == 0
            })
            .is_some();
        if removed {
            debug!(game_id, "retired hub removed");
        }
    }

    pub fn subscribe(&self, game_id: u32) -> Result<Subscription, HubError> {
        self.get_or_create(game_id).subscribe()
    }

    pub async fn unsubscribe(&self, game_id: u32, id: SubscriberId) -> Result<usize, HubError> {
        let hub = self.get(game_id).ok_or(HubError::HubNotFound(game_id))?;
        let remaining = hub.unsubscribe(id).await?;
        if remaining == 0 {
            self.remove_if_idle(game_id);
        }
        Ok(remaining)
    }

    /// Serializes `{"event": .., "data": ..}` and hands it to the game's hub.
    pub fn broadcast_event<T: Serialize>(
        &self,
        game_id: u32,
        event: &str,
        data: T,
    ) -> Result<(), HubError> {
        let hub = self.get(game_id).ok_or(HubError::HubNotFound(game_id))?;
        let payload = serde_json::to_string(&Envelope { event, data })?;
        hub.emit(payload)
    }
}

impl Default for HubRegistry {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
