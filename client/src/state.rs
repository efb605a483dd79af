//! The small record that lets a fresh process pick up an in-progress battle.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rqlink_protocol::BattleRequest;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::Credentials;
use crate::error::Result;

/// Everything one invocation hands to the next.
///
/// Credentials are stored in plaintext.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    #[serde(rename = "ps_username")]
    pub username: Option<String>,
    #[serde(rename = "ps_password")]
    pub password: Option<String>,
    #[serde(rename = "websocket_uri")]
    pub server_url: Option<String>,
    pub battle_id: Option<String>,
    pub rqid: Option<u64>,
    pub turn: Option<u32>,
    pub request: Option<BattleRequest>,
    pub finished: bool,
    pub winner: Option<String>,
    pub tie: bool,
    /// Unix time of the last write, in seconds. Older records carry a
    /// fractional part.
    pub updated_at: Option<f64>,
}

impl PersistedState {
    pub fn record_credentials(&mut self, credentials: &Credentials) {
        self.username = Some(credentials.username.clone());
        self.password = credentials.password.clone();
        self.server_url = Some(credentials.server_url.clone());
    }

    /// Point the record at a (possibly new) battle, clearing everything
    /// recorded about any previous one.
    pub fn enter_battle(&mut self, battle_id: &str) {
        if self.battle_id.as_deref() != Some(battle_id) {
            self.rqid = None;
            self.turn = None;
            self.request = None;
            self.finished = false;
            self.winner = None;
            self.tie = false;
        }
        self.battle_id = Some(battle_id.to_string());
    }

    fn touch(&mut self) {
        self.updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs() as f64);
    }
}

/// Loads and atomically replaces the state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record left by a previous invocation.
    ///
    /// A missing, unreadable or malformed file all mean "no prior session".
    pub fn load(&self) -> Option<PersistedState> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state file");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "State file unreadable, ignoring it");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "State file corrupt, ignoring it");
                None
            }
        }
    }

    /// Write the whole record to a temp file next to the target, then rename
    /// it over the target.
    pub fn save(&self, state: &mut PersistedState) -> Result<()> {
        state.touch();

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, state).map_err(io::Error::from)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            path = %self.path.display(),
            battle_id = ?state.battle_id,
            rqid = ?state.rqid,
            "Saved state"
        );
        Ok(())
    }
}
