mod battle_progress;
mod global;
pub mod request;
mod room;

use crate::ParseError;
use anyhow::{Context, Result};
pub use request::BattleRequest;

/// Room type announced by `|init|`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomType {
    Chat,
    Battle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// |challstr|CHALLSTR
    Challstr(String),

    /// |updateuser|USER|NAMED|AVATAR|SETTINGS
    UpdateUser {
        username: String,
        named: bool,
        avatar: String,
    },

    /// |nametaken|USERNAME|MESSAGE
    NameTaken { username: String, message: String },

    /// |popup|MESSAGE
    Popup(String),

    /// |init|ROOMTYPE, sent when we join a room
    Init(RoomType),

    /// |noinit|REASON|MESSAGE, sent when a join fails
    NoInit { reason: String, message: String },

    /// |title|TITLE
    Title(String),

    /// |request|JSON
    Request(Box<BattleRequest>),

    /// |turn|NUMBER
    Turn(u32),

    /// |win|USER
    Win(String),

    /// |tie
    Tie,

    /// |error|MESSAGE
    Error(String),

    /// Chat or battle-log line, kept verbatim
    Action(String),

    /// Anything we don't recognize
    Raw(String),
}

/// One websocket frame: an optional room and the messages addressed to it.
///
/// `lines` holds the raw text of each entry in `messages`, index for index.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerFrame {
    pub room_id: Option<String>,
    pub messages: Vec<ServerMessage>,
    pub lines: Vec<String>,
}

impl ServerFrame {
    /// Iterate over (raw line, parsed message) pairs in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServerMessage)> {
        self.lines
            .iter()
            .map(String::as_str)
            .zip(self.messages.iter())
    }

    /// Whether this frame belongs to the given room
    pub fn is_for_room(&self, room: &str) -> bool {
        self.room_id.as_deref() == Some(room)
    }

    /// The room id if this frame announces that we joined a battle
    pub fn joined_battle(&self) -> Option<&str> {
        let room = self.room_id.as_deref()?;
        self.messages
            .iter()
            .any(|m| matches!(m, ServerMessage::Init(RoomType::Battle)))
            .then_some(room)
    }
}

/// Parse a complete WebSocket frame into structured messages
pub fn parse_server_frame(frame: &str) -> Result<ServerFrame> {
    let mut lines = frame.lines();
    let mut room_id = None;

    // Check if first line is >ROOMID
    if let Some(first_line) = lines.clone().next()
        && let Some(room) = first_line.strip_prefix('>')
    {
        room_id = Some(room.trim().to_string());
        lines.next();
    }

    let mut messages = Vec::new();
    let mut raw = Vec::new();
    for line in lines.filter(|line| !line.trim().is_empty()) {
        messages.push(parse_server_message(line).with_context(|| line.to_string())?);
        raw.push(line.to_string());
    }

    Ok(ServerFrame {
        room_id,
        messages,
        lines: raw,
    })
}

/// Parse a single line from the server into a ServerMessage
pub fn parse_server_message(line: &str) -> Result<ServerMessage> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line.trim().is_empty() {
        return Err(ParseError::EmptyMessage.into());
    }

    if !line.starts_with('|') {
        return Ok(ServerMessage::Raw(line.to_string()));
    }

    let parts: Vec<&str> = line.split('|').collect();

    match parts[1] {
        "challstr" => global::parse_challstr(&parts),
        "updateuser" => global::parse_updateuser(&parts),
        "nametaken" => global::parse_nametaken(&parts),
        "popup" => global::parse_popup(&parts),
        "init" => room::parse_init(&parts),
        "noinit" => room::parse_noinit(&parts),
        "title" => room::parse_title(&parts),
        "request" => battle_progress::parse_request(&parts),
        "turn" => battle_progress::parse_turn(&parts),
        "win" => battle_progress::parse_win(&parts),
        "tie" => battle_progress::parse_tie(&parts),
        "error" => battle_progress::parse_error(&parts),
        kind if room::is_log_type(kind) => Ok(ServerMessage::Action(line.to_string())),
        _ => Ok(ServerMessage::Raw(line.to_string())),
    }
}

/// Reduce a display name to its user id: lowercase ASCII letters and digits only
pub fn to_id(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
