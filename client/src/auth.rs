//! Challenge/response login.
//!
//! The server pushes a challstr on connect. We trade it for a signed
//! assertion at the login server, send `/trn` quoting that assertion and
//! wait for the server to confirm the name.

use std::time::Duration;

use rqlink_protocol::{ClientCommand, ClientMessage, ServerMessage, to_id};
use tokio::time::Instant;

use crate::config::{ClientConfig, Credentials};
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// Source of signed login assertions
pub trait AssertionProvider {
    /// Exchange a challstr for an assertion. A `None` password asks for a
    /// guest assertion.
    async fn assertion(
        &self,
        username: &str,
        password: Option<&str>,
        challstr: &str,
    ) -> Result<String>;
}

/// The Pokemon Showdown login server
#[derive(Debug, Clone)]
pub struct LoginServer {
    http: reqwest::Client,
    login_url: String,
    guest_login_url: String,
}

impl LoginServer {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            login_url: config.login_url.clone(),
            guest_login_url: config.guest_login_url.clone(),
        }
    }
}

impl AssertionProvider for LoginServer {
    async fn assertion(
        &self,
        username: &str,
        password: Option<&str>,
        challstr: &str,
    ) -> Result<String> {
        let response = match password {
            Some(password) => {
                self.http
                    .post(&self.login_url)
                    .form(&[
                        ("name", username),
                        ("pass", password),
                        ("challstr", challstr),
                    ])
                    .send()
                    .await?
            }
            None => {
                let userid = to_id(username);
                self.http
                    .post(&self.guest_login_url)
                    .form(&[
                        ("act", "getassertion"),
                        ("userid", userid.as_str()),
                        ("challstr", challstr),
                    ])
                    .send()
                    .await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::AuthRejected(format!(
                "login server returned {}",
                status
            )));
        }

        let body = response.text().await?;
        match password {
            Some(_) => parse_login_response(&body),
            None => parse_guest_response(&body),
        }
    }
}

/// Password login answers with `]` followed by JSON
fn parse_login_response(body: &str) -> Result<String> {
    let json_str = body.trim().trim_start_matches(']');
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| ClientError::AuthRejected(format!("unreadable login response: {}", e)))?;

    let assertion = json.get("assertion").and_then(|v| v.as_str());

    if json.get("actionsuccess").and_then(|v| v.as_bool()) != Some(true) {
        let reason = assertion
            .map(|a| a.trim_start_matches(";;"))
            .unwrap_or("Unknown error");
        return Err(ClientError::AuthRejected(reason.to_string()));
    }

    match assertion {
        Some(a) if a.starts_with(";;") => Err(ClientError::AuthRejected(a[2..].to_string())),
        Some(a) if !a.is_empty() => Ok(a.to_string()),
        _ => Err(ClientError::AuthRejected(
            "login response missing assertion".to_string(),
        )),
    }
}

/// Guest login answers with the bare assertion
fn parse_guest_response(body: &str) -> Result<String> {
    let assertion = body.trim();
    if let Some(error_msg) = assertion.strip_prefix(";;") {
        return Err(ClientError::AuthRejected(error_msg.to_string()));
    }
    if assertion.is_empty() {
        return Err(ClientError::AuthRejected("empty guest assertion".to_string()));
    }
    Ok(assertion.to_string())
}

/// Client authentication state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    AwaitingChallenge,
    ChallengeReceived,
    LoginSubmitted,
    Authenticated,
    Failed,
}

/// The name the server confirmed, valid for this connection only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub assertion: String,
}

/// Drives one login over a connection
pub struct Authenticator<'a> {
    credentials: &'a Credentials,
    state: AuthState,
}

impl<'a> Authenticator<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            credentials,
            state: AuthState::AwaitingChallenge,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Run the login to completion or failure within `timeout`
    pub async fn login<T, A>(
        &mut self,
        connection: &mut Connection<T>,
        assertions: &A,
        timeout: Duration,
    ) -> Result<Identity>
    where
        T: Transport,
        A: AssertionProvider,
    {
        let result = self.run(connection, assertions, timeout).await;
        if let Err(e) = &result {
            self.transition(AuthState::Failed);
            tracing::warn!(username = %self.credentials.username, error = %e, "Login failed");
        }
        result
    }

    async fn run<T, A>(
        &mut self,
        connection: &mut Connection<T>,
        assertions: &A,
        timeout: Duration,
    ) -> Result<Identity>
    where
        T: Transport,
        A: AssertionProvider,
    {
        let deadline = Instant::now() + timeout;

        let challstr = self.wait_for_challstr(connection, deadline, timeout).await?;
        self.transition(AuthState::ChallengeReceived);

        let remaining = deadline.saturating_duration_since(Instant::now());
        let assertion = tokio::time::timeout(
            remaining,
            assertions.assertion(
                &self.credentials.username,
                self.credentials.password.as_deref(),
                &challstr,
            ),
        )
        .await
        .map_err(|_| ClientError::AuthTimeout(timeout))??;

        connection
            .send(ClientMessage::global(ClientCommand::TrustedLogin {
                username: self.credentials.username.clone(),
                assertion: assertion.clone(),
            }))
            .await?;
        self.transition(AuthState::LoginSubmitted);

        let username = self
            .wait_for_login_confirmation(connection, deadline, timeout)
            .await?;
        self.transition(AuthState::Authenticated);
        tracing::info!(username = %username, "Logged in");

        Ok(Identity {
            username,
            assertion,
        })
    }

    /// Wait for the challstr message from the server
    async fn wait_for_challstr<T: Transport>(
        &mut self,
        connection: &mut Connection<T>,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<String> {
        loop {
            let Some(frame) = connection.read_frame(deadline).await? else {
                return Err(ClientError::AuthTimeout(timeout));
            };
            if frame.room_id.is_some() {
                connection.defer(frame);
                continue;
            }
            for message in &frame.messages {
                if let ServerMessage::Challstr(challstr) = message {
                    return Ok(challstr.clone());
                }
            }
        }
    }

    /// Wait for an updateuser line naming us as a registered (named) user
    async fn wait_for_login_confirmation<T: Transport>(
        &mut self,
        connection: &mut Connection<T>,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<String> {
        let wanted = to_id(&self.credentials.username);
        loop {
            let Some(frame) = connection.read_frame(deadline).await? else {
                return Err(ClientError::AuthTimeout(timeout));
            };
            if frame.room_id.is_some() {
                connection.defer(frame);
                continue;
            }
            for message in &frame.messages {
                match message {
                    ServerMessage::UpdateUser {
                        username, named, ..
                    } if *named && to_id(username) == wanted => {
                        return Ok(username.trim().to_string());
                    }
                    ServerMessage::NameTaken { message, .. } => {
                        return Err(ClientError::AuthRejected(message.clone()));
                    }
                    ServerMessage::Popup(message) => {
                        tracing::warn!(message = %message, "Popup while logging in");
                    }
                    _ => {}
                }
            }
        }
    }

    fn transition(&mut self, next: AuthState) {
        tracing::debug!(from = ?self.state, to = ?next, "Auth state");
        self.state = next;
    }
}
