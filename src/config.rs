use std::path::PathBuf;
use std::time::Duration;

use crate::bus::presence::DEFAULT_PRESENCE_TTL;

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    /// Cookie signing key, 64+ bytes. `None` means a random key per start.
    pub session_key: Option<String>,
    pub presence_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, String> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is not set".to_string())?;
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "data/uploads".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{bind_addr}"));

        let session_key = match std::env::var("SESSION_KEY") {
            Ok(val) if val.len() >= 64 => {
                log::info!("Using SESSION_KEY from environment");
                Some(val)
            }
            Ok(val) => {
                log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
                None
            }
            Err(_) => {
                log::warn!("No SESSION_KEY set, generating random key (surface roles reset on restart)");
                None
            }
        };

        let presence_ttl = match std::env::var("PRESENCE_TTL_SECS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    log::warn!("Ignoring invalid PRESENCE_TTL_SECS '{raw}'");
                    DEFAULT_PRESENCE_TTL
                }
            },
            Err(_) => DEFAULT_PRESENCE_TTL,
        };

        Ok(Config {
            database_url,
            bind_addr,
            upload_dir: PathBuf::from(upload_dir),
            public_base_url,
            session_key,
            presence_ttl,
        })
    }
}
