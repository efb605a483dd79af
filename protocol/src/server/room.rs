use super::{RoomType, ServerMessage};
use crate::ParseError;
use anyhow::Result;

/// Chat and battle-log message types that carry no state we act on.
const LOG_TYPES: &[&str] = &[
    "c", "c:", "chat", "j", "J", "join", "l", "L", "leave", "n", "N", "name", "b", "B",
    "battle", "raw", "html", "uhtml", "uhtmlchange", "t:", "timestamp", "users", "deinit",
    "player", "teamsize", "gametype", "gen", "tier", "rated", "rule", "clearpoke", "poke",
    "teampreview", "start", "move", "switch", "drag", "detailschange", "replace", "swap",
    "cant", "faint", "upkeep", "inactive", "inactiveoff", "message", "debug", "seed",
    "split", "badge", "sentchoice", "bigerror", "notify", "",
];

pub fn parse_init(parts: &[&str]) -> Result<ServerMessage> {
    if parts.len() < 3 {
        return Err(ParseError::MissingField("init fields".to_string()).into());
    }

    let room_type = match parts[2] {
        "chat" => RoomType::Chat,
        "battle" => RoomType::Battle,
        _ => {
            return Err(
                ParseError::InvalidFormat(format!("unknown room type: {}", parts[2])).into(),
            );
        }
    };

    Ok(ServerMessage::Init(room_type))
}

pub fn parse_noinit(parts: &[&str]) -> Result<ServerMessage> {
    let reason = parts.get(2).unwrap_or(&"").to_string();
    let message = parts.get(3..).map(|rest| rest.join("|")).unwrap_or_default();

    Ok(ServerMessage::NoInit { reason, message })
}

pub fn parse_title(parts: &[&str]) -> Result<ServerMessage> {
    if parts.len() < 3 {
        return Err(ParseError::MissingField("title field".to_string()).into());
    }

    Ok(ServerMessage::Title(parts[2..].join("|")))
}

/// Whether a message type is a chat or battle-log line.
///
/// Minor battle actions are all prefixed with `-` (`-damage`, `-boost`, ...).
pub fn is_log_type(kind: &str) -> bool {
    kind.starts_with('-') || LOG_TYPES.contains(&kind)
}
