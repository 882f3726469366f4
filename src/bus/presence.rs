use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// A surface that misses heartbeats for this long counts as gone.
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Serialize)]
pub struct PresenceEntry {
    pub key: String,
    pub role: String,
    #[serde(skip)]
    pub last_seen: Instant,
}

/// Who is listening on each channel, refreshed by heartbeats.
#[derive(Debug)]
pub struct PresenceRegistry {
    channels: RwLock<HashMap<String, HashMap<String, PresenceEntry>>>,
    ttl: Duration,
}

impl PresenceRegistry {
    pub fn new(ttl: Duration) -> Self {
        PresenceRegistry {
            channels: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn join(&self, channel: &str, key: &str, role: &str, now: Instant) {
        if let Ok(mut map) = self.channels.write() {
            map.entry(channel.to_string()).or_default().insert(
                key.to_string(),
                PresenceEntry {
                    key: key.to_string(),
                    role: role.to_string(),
                    last_seen: now,
                },
            );
        }
    }

    /// Refresh `key`. Returns false if it never joined or already left.
    pub fn heartbeat(&self, channel: &str, key: &str, now: Instant) -> bool {
        let Ok(mut map) = self.channels.write() else {
            return false;
        };
        match map.get_mut(channel).and_then(|c| c.get_mut(key)) {
            Some(entry) => {
                entry.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub fn leave(&self, channel: &str, key: &str) {
        if let Ok(mut map) = self.channels.write() {
            if let Some(entries) = map.get_mut(channel) {
                entries.remove(key);
                if entries.is_empty() {
                    map.remove(channel);
                }
            }
        }
    }

    /// Live entries on `channel`.
    pub fn members(&self, channel: &str, now: Instant) -> Vec<PresenceEntry> {
        let Ok(map) = self.channels.read() else {
            return Vec::new();
        };
        map.get(channel)
            .map(|entries| {
                entries
                    .values()
                    .filter(|e| now.duration_since(e.last_seen) < self.ttl)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any live entry with `role` is on `channel`.
    pub fn is_present(&self, channel: &str, role: &str, now: Instant) -> bool {
        self.members(channel, now).iter().any(|e| e.role == role)
    }
}

/// Random 16-byte hex key identifying one connection.
pub fn generate_presence_key() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}
