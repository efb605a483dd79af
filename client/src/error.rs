use std::time::Duration;

use thiserror::Error;

/// Everything that can end an invocation early.
///
/// No layer retries on any of these; the caller decides.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection closed by server")]
    ConnectionClosed,

    #[error("Login server request failed: {0}")]
    LoginServer(#[from] reqwest::Error),

    #[error("Login not confirmed within {}s", .0.as_secs())]
    AuthTimeout(Duration),

    #[error("Login rejected: {0}")]
    AuthRejected(String),

    #[error("Timed out after {}s waiting for {waiting_for}", .timeout.as_secs())]
    Timeout {
        waiting_for: &'static str,
        timeout: Duration,
    },

    /// The server answered a command with an `|error|` line
    #[error("Server error: {0}")]
    Protocol(String),

    #[error("Cannot join {room}: {message}")]
    RoomUnavailable { room: String, message: String },

    #[error("Malformed server message: {0:#}")]
    Malformed(#[from] anyhow::Error),

    #[error("battle_id is required (or provide it in the state file)")]
    MissingBattleId,

    #[error("rqid is required (or enable refresh polling)")]
    MissingRqid,

    #[error("choice must be non-empty")]
    EmptyChoice,

    #[error("{0} is required (or provide it in the state file)")]
    MissingCredential(&'static str),

    #[error("Failed to write state file: {0}")]
    StateWrite(#[from] std::io::Error),
}

impl ClientError {
    /// A wait ran out of time; polling again later may succeed
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::AuthTimeout(_))
    }

    /// The socket or the login server could not be reached
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectionClosed | Self::LoginServer(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
