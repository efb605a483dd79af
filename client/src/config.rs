use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::state::PersistedState;

pub const SHOWDOWN_URL: &str = "wss://sim3.psim.us/showdown/websocket";
pub const LOGIN_URL: &str = "https://play.pokemonshowdown.com/api/login";
pub const GUEST_LOGIN_URL: &str = "https://play.pokemonshowdown.com/action.php";
pub const DEFAULT_STATE_PATH: &str = "ps_client_state.json";

/// Endpoints, state location and wait budgets for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub login_url: String,
    pub guest_login_url: String,
    pub state_path: PathBuf,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: SHOWDOWN_URL.to_string(),
            login_url: LOGIN_URL.to_string(),
            guest_login_url: GUEST_LOGIN_URL.to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Read a JSON config file. Fields that are absent keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}

/// Wait budgets, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub connect_secs: u64,
    pub auth_secs: u64,
    /// start: waiting for the search to produce a battle room
    pub search_secs: u64,
    /// start: waiting for the first request once the room exists
    pub first_request_secs: u64,
    pub poll_secs: u64,
    /// choose: polling for a fresh rqid before submitting
    pub refresh_secs: u64,
    /// choose: waiting for the next request after submitting
    pub choose_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: 15,
            auth_secs: 30,
            search_secs: 60,
            first_request_secs: 30,
            poll_secs: 30,
            refresh_secs: 15,
            choose_secs: 30,
        }
    }
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn auth(&self) -> Duration {
        Duration::from_secs(self.auth_secs)
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn first_request(&self) -> Duration {
        Duration::from_secs(self.first_request_secs)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn choose(&self) -> Duration {
        Duration::from_secs(self.choose_secs)
    }
}

/// Login name, optional password (guest login without one) and the
/// websocket endpoint they are used against.
///
/// Persisted in plaintext alongside the battle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
    pub server_url: String,
}

impl Credentials {
    /// Merge explicit values with a persisted record.
    ///
    /// Explicit values win, then persisted ones. The endpoint finally falls
    /// back to the configured default.
    pub fn resolve(
        username: Option<String>,
        password: Option<String>,
        server_url: Option<String>,
        config: &ClientConfig,
        state: Option<&PersistedState>,
    ) -> Result<Self> {
        let username = username
            .or_else(|| state.and_then(|s| s.username.clone()))
            .filter(|u| !u.trim().is_empty())
            .ok_or(ClientError::MissingCredential("username"))?;

        let password = password.or_else(|| state.and_then(|s| s.password.clone()));

        let server_url = server_url
            .or_else(|| state.and_then(|s| s.server_url.clone()))
            .unwrap_or_else(|| config.server_url.clone());

        Ok(Self {
            username,
            password,
            server_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"state_path":"/tmp/x.json","timeouts":{"poll_secs":5}}"#)
                .unwrap();

        assert_eq!(config.state_path, PathBuf::from("/tmp/x.json"));
        assert_eq!(config.server_url, SHOWDOWN_URL);
        assert_eq!(config.timeouts.poll(), Duration::from_secs(5));
        assert_eq!(config.timeouts.choose(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server_url":"ws://localhost:8000/showdown/websocket"}"#)
            .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.server_url, "ws://localhost:8000/showdown/websocket");
        assert!(ClientConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit_values() {
        let state = PersistedState {
            username: Some("stored".into()),
            password: Some("hunter2".into()),
            server_url: Some("ws://stored".into()),
            ..Default::default()
        };
        let config = ClientConfig::default();

        let creds =
            Credentials::resolve(Some("ash".into()), None, None, &config, Some(&state)).unwrap();
        assert_eq!(creds.username, "ash");
        assert_eq!(creds.password.as_deref(), Some("hunter2"));
        assert_eq!(creds.server_url, "ws://stored");
    }

    #[test]
    fn test_resolve_requires_username() {
        let config = ClientConfig::default();
        let err = Credentials::resolve(None, None, None, &config, None).unwrap_err();

        assert!(matches!(err, ClientError::MissingCredential("username")));
    }

    #[test]
    fn test_resolve_falls_back_to_default_endpoint() {
        let config = ClientConfig::default();
        let creds = Credentials::resolve(Some("ash".into()), None, None, &config, None).unwrap();

        assert_eq!(creds.server_url, SHOWDOWN_URL);
        assert_eq!(creds.password, None);
    }
}
