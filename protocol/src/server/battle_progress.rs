//! Battle progress message parsers
//!
//! These messages drive the request/choice cycle and end the battle.

use super::ServerMessage;
use super::request::BattleRequest;
use crate::ParseError;
use anyhow::{Context, Result};

/// Parse |request|REQUEST (JSON)
pub fn parse_request(parts: &[&str]) -> Result<ServerMessage> {
    // JSON can contain | characters
    let json_str = parts.get(2..).map(|rest| rest.join("|")).unwrap_or_default();

    let request = if json_str.trim().is_empty() {
        BattleRequest::default()
    } else {
        serde_json::from_str(&json_str).context("invalid request json")?
    };

    Ok(ServerMessage::Request(Box::new(request)))
}

/// Parse |turn|NUMBER
pub fn parse_turn(parts: &[&str]) -> Result<ServerMessage> {
    let turn = parts
        .get(2)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ParseError::MissingField("turn number".to_string()))?;

    Ok(ServerMessage::Turn(turn))
}

/// Parse |win|USER
pub fn parse_win(parts: &[&str]) -> Result<ServerMessage> {
    let user = parts.get(2..).map(|rest| rest.join("|")).unwrap_or_default();
    Ok(ServerMessage::Win(user))
}

/// Parse |tie
pub fn parse_tie(_parts: &[&str]) -> Result<ServerMessage> {
    Ok(ServerMessage::Tie)
}

/// Parse |error|MESSAGE
pub fn parse_error(parts: &[&str]) -> Result<ServerMessage> {
    let message = parts.get(2..).map(|rest| rest.join("|")).unwrap_or_default();
    Ok(ServerMessage::Error(message))
}
