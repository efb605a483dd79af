//! Stateless client for one Pokemon Showdown battle.
//!
//! Every call opens its own connection, logs in, does one exchange with a
//! battle room and exits. What the next call needs (credentials, room id,
//! last rqid and request) is kept in a small state file.
//!
//! ```ignore
//! use rqlink_client::{ClientConfig, Credentials, RoomSession, StateStore};
//!
//! let config = ClientConfig::default();
//! let state = StateStore::new(&config.state_path).load();
//! let credentials = Credentials::resolve(Some("ash".into()), None, None, &config, state.as_ref())?;
//!
//! let poll = RoomSession::connect(config.clone(), credentials.clone())
//!     .await?
//!     .poll(None, config.timeouts.poll())
//!     .await?;
//!
//! let outcome = RoomSession::connect(config.clone(), credentials)
//!     .await?
//!     .choose(None, "move 1", poll.rqid, true, config.timeouts.choose())
//!     .await?;
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod config;
mod connection;
mod error;
mod options;
mod session;
mod state;
mod transport;

pub use rqlink_protocol::{BattleRequest, ClientCommand, ClientMessage, ServerFrame, ServerMessage};

pub use auth::{AssertionProvider, AuthState, Authenticator, Identity, LoginServer};
pub use config::{
    ClientConfig, Credentials, DEFAULT_STATE_PATH, GUEST_LOGIN_URL, LOGIN_URL, SHOWDOWN_URL,
    Timeouts,
};
pub use connection::Connection;
pub use error::{ClientError, Result};
pub use options::{BattleOptions, MoveOption, SwitchOption};
pub use session::{ChooseOutcome, ChooseResult, PollOutcome, RoomSession, StartOutcome};
pub use state::{PersistedState, StateStore};
pub use transport::{Transport, WebSocketTransport};
