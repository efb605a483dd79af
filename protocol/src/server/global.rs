//! Lines for the global room: login handshake and popups.

use super::ServerMessage;
use crate::ParseError;
use anyhow::Result;

fn missing(what: &str) -> anyhow::Error {
    ParseError::MissingField(what.to_string()).into()
}

/// `|challstr|CHALLSTR`, where the challenge itself contains `|`
pub fn parse_challstr(parts: &[&str]) -> Result<ServerMessage> {
    let challstr = parts.get(2..).map(|rest| rest.join("|")).unwrap_or_default();
    if challstr.is_empty() {
        return Err(missing("challstr value"));
    }
    Ok(ServerMessage::Challstr(challstr))
}

/// `|updateuser|USER|NAMED|AVATAR|SETTINGS`
pub fn parse_updateuser(parts: &[&str]) -> Result<ServerMessage> {
    let [_, _, user, named, rest @ ..] = parts else {
        return Err(missing("updateuser fields"));
    };
    if user.trim().is_empty() {
        return Err(ParseError::InvalidFormat("updateuser without a user".to_string()).into());
    }

    // USER keeps its rank prefix; compare with to_id()
    Ok(ServerMessage::UpdateUser {
        username: user.to_string(),
        named: *named == "1",
        avatar: rest.first().copied().unwrap_or_default().to_string(),
    })
}

/// `|nametaken|USER|MESSAGE`
pub fn parse_nametaken(parts: &[&str]) -> Result<ServerMessage> {
    let [_, _, user, message @ ..] = parts else {
        return Err(missing("nametaken user"));
    };
    if message.is_empty() {
        return Err(missing("nametaken message"));
    }
    Ok(ServerMessage::NameTaken {
        username: user.to_string(),
        message: message.join("|"),
    })
}

pub fn parse_popup(parts: &[&str]) -> Result<ServerMessage> {
    match parts.get(2..) {
        Some(message) if !message.is_empty() => Ok(ServerMessage::Popup(message.join("|"))),
        _ => Err(missing("popup message")),
    }
}
