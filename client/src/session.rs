//! One battle room, one invocation.
//!
//! Each operation authenticates on a fresh connection, does its single
//! exchange with the battle room, writes the persisted state and closes the
//! connection on every exit path.

use std::time::Duration;

use rqlink_protocol::{BattleRequest, ClientCommand, ClientMessage, ServerMessage};
use serde::Serialize;
use tokio::time::Instant;

use crate::auth::{AssertionProvider, Authenticator, Identity, LoginServer};
use crate::config::{ClientConfig, Credentials};
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::options::BattleOptions;
use crate::state::{PersistedState, StateStore};
use crate::transport::{Transport, WebSocketTransport};

/// Result of [`RoomSession::start`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartOutcome {
    pub battle_id: String,
    pub title: Option<String>,
    /// Missing when the first request did not arrive in time
    pub rqid: Option<u64>,
    pub turn: Option<u32>,
    pub request: Option<BattleRequest>,
    pub options: BattleOptions,
}

/// Result of [`RoomSession::poll`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollOutcome {
    pub battle_id: String,
    pub rqid: Option<u64>,
    pub turn: Option<u32>,
    pub request: BattleRequest,
    pub options: BattleOptions,
    /// Last `|error|` line the room showed us, if any
    pub error: Option<String>,
}

/// Result of [`RoomSession::choose`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChooseOutcome {
    pub battle_id: String,
    /// The command text that was submitted
    pub sent: String,
    /// The rqid the submitted choice quoted
    pub rqid: u64,
    pub turn: Option<u32>,
    /// Every raw room line seen after submitting, in arrival order
    pub events: Vec<String>,
    pub result: ChooseResult,
}

impl ChooseOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self.result, ChooseResult::Finished { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChooseResult {
    /// The battle continues with a new decision point
    Request {
        request: BattleRequest,
        options: BattleOptions,
        rqid: Option<u64>,
    },
    /// The battle is over
    Finished { winner: Option<String>, tie: bool },
}

/// What a request wait observed
struct RequestWait {
    request: BattleRequest,
    turn: Option<u32>,
    error: Option<String>,
}

struct BattleJoin {
    battle_id: String,
    title: Option<String>,
}

/// Orchestrates start / poll / choose against one battle room
pub struct RoomSession<T, A> {
    config: ClientConfig,
    credentials: Credentials,
    connection: Connection<T>,
    assertions: A,
    store: StateStore,
}

impl RoomSession<WebSocketTransport, LoginServer> {
    /// Open a websocket to the credentials' endpoint
    pub async fn connect(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let transport =
            WebSocketTransport::connect(&credentials.server_url, config.timeouts.connect())
                .await?;
        let assertions = LoginServer::new(&config);
        Ok(Self::new(config, credentials, transport, assertions))
    }
}

impl<T, A> RoomSession<T, A>
where
    T: Transport,
    A: AssertionProvider,
{
    pub fn new(config: ClientConfig, credentials: Credentials, transport: T, assertions: A) -> Self {
        let store = StateStore::new(config.state_path.clone());
        Self {
            config,
            credentials,
            connection: Connection::new(transport),
            assertions,
            store,
        }
    }

    /// Log in, search for a battle in `format` and wait for its first request.
    ///
    /// Random formats take no team. A missing first request is not an error:
    /// the room exists and can be polled later.
    pub async fn start(
        mut self,
        format: &str,
        team: Option<&str>,
        search_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<StartOutcome> {
        let result = self
            .run_start(format, team, search_timeout, request_timeout)
            .await;
        self.connection.close().await;
        result
    }

    /// Join the battle and return its current request.
    ///
    /// On timeout nothing is persisted.
    pub async fn poll(mut self, battle_id: Option<&str>, timeout: Duration) -> Result<PollOutcome> {
        let result = self.run_poll(battle_id, timeout).await;
        self.connection.close().await;
        result
    }

    /// Submit `choice` and wait for the next request or the end of the battle.
    ///
    /// With `refresh` the rqid is taken from the request the server shows on
    /// joining. Without it the given rqid, or the persisted one, is quoted
    /// as is. `timeout` bounds the wait after submitting.
    pub async fn choose(
        mut self,
        battle_id: Option<&str>,
        choice: &str,
        rqid: Option<u64>,
        refresh: bool,
        timeout: Duration,
    ) -> Result<ChooseOutcome> {
        let result = self
            .run_choose(battle_id, choice, rqid, refresh, timeout)
            .await;
        self.connection.close().await;
        result
    }

    async fn run_start(
        &mut self,
        format: &str,
        team: Option<&str>,
        search_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<StartOutcome> {
        self.authenticate().await?;

        // Rooms replayed on login belong to earlier battles
        let stale = self.connection.clear_deferred();
        if stale > 0 {
            tracing::debug!(frames = stale, "Dropped frames from rooms joined at login");
        }

        let team = team.map(str::trim).filter(|t| !t.is_empty()).unwrap_or("None");
        self.connection
            .send(ClientMessage::global(ClientCommand::UpdateTeam(team.to_string())))
            .await?;
        self.connection
            .send(ClientMessage::global(ClientCommand::Search(format.to_string())))
            .await?;
        tracing::info!(format, "Searching for a battle");

        let join = match self.wait_for_battle(search_timeout).await {
            Ok(join) => join,
            Err(e) => {
                if e.is_timeout()
                    && let Err(cancel_err) = self
                        .connection
                        .send(ClientMessage::global(ClientCommand::CancelSearch))
                        .await
                {
                    tracing::warn!(error = %cancel_err, "Failed to cancel search");
                }
                return Err(e);
            }
        };
        tracing::info!(battle_id = %join.battle_id, title = ?join.title, "Battle started");

        self.connection
            .send(ClientMessage::in_room(&join.battle_id, ClientCommand::Timer(true)))
            .await?;

        let wait = match self.wait_for_request(&join.battle_id, request_timeout).await {
            Ok(wait) => Some(wait),
            Err(e) if e.is_timeout() => {
                tracing::info!(battle_id = %join.battle_id, "No request yet, poll later");
                None
            }
            Err(e) => return Err(e),
        };

        let mut state = self.store.load().unwrap_or_default();
        state.enter_battle(&join.battle_id);
        let (request, turn) = match wait {
            Some(wait) => (Some(wait.request), wait.turn),
            None => (None, None),
        };
        let rqid = request.as_ref().and_then(|r| r.rqid);
        state.rqid = rqid;
        state.turn = turn;
        state.request = request.clone();
        self.persist(&mut state)?;

        Ok(StartOutcome {
            options: request.as_ref().map(BattleOptions::from).unwrap_or_default(),
            battle_id: join.battle_id,
            title: join.title,
            rqid,
            turn,
            request,
        })
    }

    async fn run_poll(&mut self, battle_id: Option<&str>, timeout: Duration) -> Result<PollOutcome> {
        let mut state = self.store.load().unwrap_or_default();
        let battle_id = resolve_battle_id(battle_id, &state)?;

        self.authenticate().await?;
        self.join(&battle_id).await?;

        let wait = self.wait_for_request(&battle_id, timeout).await?;

        state.enter_battle(&battle_id);
        record_request(&mut state, &wait);
        self.persist(&mut state)?;

        Ok(PollOutcome {
            rqid: wait.request.rqid,
            turn: state.turn,
            options: BattleOptions::from_request(&wait.request),
            request: wait.request,
            error: wait.error,
            battle_id,
        })
    }

    async fn run_choose(
        &mut self,
        battle_id: Option<&str>,
        choice: &str,
        rqid: Option<u64>,
        refresh: bool,
        timeout: Duration,
    ) -> Result<ChooseOutcome> {
        let choice = normalize_choice(choice)?;
        let mut state = self.store.load().unwrap_or_default();
        let battle_id = resolve_battle_id(battle_id, &state)?;

        let persisted_rqid = if state.battle_id.as_deref() == Some(battle_id.as_str()) {
            state.rqid
        } else {
            None
        };
        // A refresh asks for the live rqid; only one the caller supplied may
        // stand in for it
        let fallback = if refresh {
            rqid
        } else {
            rqid.or(persisted_rqid)
        };

        self.authenticate().await?;
        self.join(&battle_id).await?;

        // Joining replays the room and its current request. Read up to it
        // either way so the replay is not mistaken for a response to our
        // choice.
        let observed = match self
            .wait_for_request(&battle_id, self.config.timeouts.refresh())
            .await
        {
            Ok(wait) => Some(wait),
            Err(e) if e.is_timeout() && fallback.is_some() => {
                tracing::warn!(battle_id = %battle_id, "No current request seen, quoting known rqid");
                None
            }
            Err(e) => return Err(e),
        };

        let observed_rqid = observed.as_ref().and_then(|w| w.request.rqid);
        let rqid = if refresh {
            observed_rqid.or(fallback)
        } else {
            fallback.or(observed_rqid)
        }
        .ok_or(ClientError::MissingRqid)?;

        let mut turn = None;
        if let Some(wait) = &observed {
            turn = wait.turn;
            state.enter_battle(&battle_id);
            record_request(&mut state, wait);
            self.persist(&mut state)?;
        }

        let command = ClientCommand::Choose {
            choice: choice.clone(),
            rqid,
        };
        let sent = command.to_protocol_string();
        self.connection
            .send(ClientMessage::in_room(&battle_id, command))
            .await?;
        tracing::info!(battle_id = %battle_id, choice = %choice, rqid, "Choice submitted");

        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        let result = 'wait: loop {
            let Some(frame) = self.connection.next_frame(deadline).await? else {
                tracing::info!(battle_id = %battle_id, "Timed out waiting for the battle to continue");
                return Err(ClientError::Timeout {
                    waiting_for: "the next request after choosing",
                    timeout,
                });
            };
            if !frame.is_for_room(&battle_id) {
                continue;
            }

            for (line, message) in frame.iter() {
                match message {
                    ServerMessage::Request(request) => {
                        break 'wait ChooseResult::Request {
                            options: BattleOptions::from_request(request),
                            rqid: request.rqid,
                            request: (**request).clone(),
                        };
                    }
                    ServerMessage::Win(winner) => {
                        events.push(line.to_string());
                        break 'wait ChooseResult::Finished {
                            winner: Some(winner.clone()),
                            tie: false,
                        };
                    }
                    ServerMessage::Tie => {
                        events.push(line.to_string());
                        break 'wait ChooseResult::Finished {
                            winner: None,
                            tie: true,
                        };
                    }
                    ServerMessage::Error(message) => {
                        tracing::warn!(battle_id = %battle_id, rqid, error = %message, "Choice rejected");
                        return Err(ClientError::Protocol(message.clone()));
                    }
                    ServerMessage::Turn(n) => {
                        turn = Some(*n);
                        events.push(line.to_string());
                    }
                    _ => events.push(line.to_string()),
                }
            }
        };

        state.enter_battle(&battle_id);
        if turn.is_some() {
            state.turn = turn;
        }
        match &result {
            ChooseResult::Request {
                request, rqid: next, ..
            } => {
                state.rqid = next.or(Some(rqid));
                state.request = Some(request.clone());
            }
            ChooseResult::Finished { winner, tie } => {
                state.rqid = Some(rqid);
                state.finished = true;
                state.winner = winner.clone();
                state.tie = *tie;
                tracing::info!(battle_id = %battle_id, winner = ?winner, tie, "Battle finished");
            }
        }
        self.persist(&mut state)?;

        Ok(ChooseOutcome {
            battle_id,
            sent,
            rqid,
            turn,
            events,
            result,
        })
    }

    async fn authenticate(&mut self) -> Result<Identity> {
        let mut auth = Authenticator::new(&self.credentials);
        auth.login(&mut self.connection, &self.assertions, self.config.timeouts.auth())
            .await
    }

    async fn join(&mut self, battle_id: &str) -> Result<()> {
        self.connection
            .send(ClientMessage::global(ClientCommand::JoinRoom(
                battle_id.to_string(),
            )))
            .await
    }

    /// Wait for a frame announcing that we joined a battle room
    async fn wait_for_battle(&mut self, timeout: Duration) -> Result<BattleJoin> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(frame) = self.connection.next_frame(deadline).await? else {
                return Err(ClientError::Timeout {
                    waiting_for: "a battle to start",
                    timeout,
                });
            };

            if let Some(battle_id) = frame.joined_battle() {
                let title = frame.messages.iter().find_map(|m| match m {
                    ServerMessage::Title(title) => Some(title.clone()),
                    _ => None,
                });
                let battle_id = battle_id.to_string();
                // The first request may share the frame with the join
                if frame
                    .messages
                    .iter()
                    .any(|m| matches!(m, ServerMessage::Request(_)))
                {
                    self.connection.defer(frame);
                }
                return Ok(BattleJoin { battle_id, title });
            }

            for message in &frame.messages {
                if let ServerMessage::Popup(message) = message {
                    tracing::warn!(message = %message, "Popup while searching");
                }
            }
        }
    }

    /// Drain the room until it shows a request
    async fn wait_for_request(&mut self, battle_id: &str, timeout: Duration) -> Result<RequestWait> {
        let deadline = Instant::now() + timeout;
        let mut turn = None;
        let mut error = None;

        loop {
            let Some(frame) = self.connection.next_frame(deadline).await? else {
                tracing::info!(battle_id, "Timed out waiting for a request");
                return Err(ClientError::Timeout {
                    waiting_for: "a battle request",
                    timeout,
                });
            };
            if !frame.is_for_room(battle_id) {
                continue;
            }

            // Lines after the request in the same frame still count
            let mut found = None;
            for message in &frame.messages {
                match message {
                    ServerMessage::Request(request) => found = Some((**request).clone()),
                    ServerMessage::Turn(n) => turn = Some(*n),
                    ServerMessage::Error(message) => {
                        tracing::warn!(battle_id, error = %message, "Server error in room");
                        error = Some(message.clone());
                    }
                    ServerMessage::NoInit { message, .. } => {
                        return Err(ClientError::RoomUnavailable {
                            room: battle_id.to_string(),
                            message: message.clone(),
                        });
                    }
                    _ => {}
                }
            }

            if let Some(request) = found {
                return Ok(RequestWait {
                    request,
                    turn,
                    error,
                });
            }
        }
    }

    fn persist(&self, state: &mut PersistedState) -> Result<()> {
        state.record_credentials(&self.credentials);
        self.store.save(state)
    }
}

fn record_request(state: &mut PersistedState, wait: &RequestWait) {
    state.rqid = wait.request.rqid;
    if wait.turn.is_some() {
        state.turn = wait.turn;
    }
    state.request = Some(wait.request.clone());
}

fn resolve_battle_id(explicit: Option<&str>, state: &PersistedState) -> Result<String> {
    explicit
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| state.battle_id.clone())
        .ok_or(ClientError::MissingBattleId)
}

/// Trim the choice and drop a leading `/choose`
fn normalize_choice(choice: &str) -> Result<String> {
    let choice = choice.trim();
    let choice = choice.strip_prefix("/choose").map(str::trim).unwrap_or(choice);
    if choice.is_empty() {
        return Err(ClientError::EmptyChoice);
    }
    Ok(choice.to_string())
}
