//! In-process publish/subscribe bus.
//!
//! Messages are `{channel, event, payload}`. Backends publish row changes on
//! [`channels::DB`]; the projector channel carries presence and control
//! commands. The WebSocket endpoint bridges browser surfaces onto the same bus.

pub mod presence;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;

pub use presence::{PresenceEntry, PresenceRegistry, generate_presence_key};

pub mod channels {
    /// Row-change notifications from the backend.
    pub const DB: &str = "db";
    /// Projector presence and control commands.
    pub const PROJECTOR: &str = "projector";
}

pub mod events {
    pub const MEMBERS: &str = "members";
    pub const ATTENDANCE: &str = "attendance";
    pub const AGENDAS: &str = "agendas";
    pub const SETTINGS: &str = "settings";
    pub const PRESENCE: &str = "presence";
    pub const CLOSE_PROJECTOR: &str = "close_projector";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub channel: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

type SubscriberMap = HashMap<String, Vec<mpsc::UnboundedSender<BusMessage>>>;

#[derive(Clone)]
pub struct Bus {
    subscribers: Arc<RwLock<SubscriberMap>>,
    presence: Arc<PresenceRegistry>,
}

impl Bus {
    pub fn new(presence_ttl: Duration) -> Self {
        Bus {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            presence: Arc::new(PresenceRegistry::new(presence_ttl)),
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Receive every message published on `channel` from now on.
    pub fn subscribe(&self, channel: &str) -> mpsc::UnboundedReceiver<BusMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.subscribers.write() {
            Ok(mut map) => map.entry(channel.to_string()).or_default().push(tx),
            Err(_) => log::error!("Bus subscriber map poisoned, subscription to '{channel}' dropped"),
        }
        rx
    }

    /// Deliver to current subscribers of `channel`. Returns how many received it.
    pub fn publish(&self, channel: &str, event: &str, payload: serde_json::Value) -> usize {
        let msg = BusMessage {
            channel: channel.to_string(),
            event: event.to_string(),
            payload,
        };
        let mut map = match self.subscribers.write() {
            Ok(m) => m,
            Err(_) => return 0,
        };
        let Some(senders) = map.get_mut(channel) else {
            return 0;
        };
        senders.retain(|s| !s.is_closed());
        let mut delivered = 0;
        for sender in senders.iter() {
            if sender.send(msg.clone()).is_ok() {
                delivered += 1;
            }
        }
        if senders.is_empty() {
            map.remove(channel);
        }
        delivered
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.subscribers
            .read()
            .map(|m| m.get(channel).map_or(0, |s| s.iter().filter(|tx| !tx.is_closed()).count()))
            .unwrap_or(0)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new(presence::DEFAULT_PRESENCE_TTL)
    }
}
