use thiserror::Error;

pub mod client;
pub mod server;

pub use client::{ClientCommand, ClientMessage};
pub use server::request::{ActivePokemon, BattleRequest, MoveSlot, SideInfo, SidePokemon};
pub use server::{
    RoomType, ServerFrame, ServerMessage, parse_server_frame, parse_server_message, to_id,
};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Empty message")]
    EmptyMessage,
}
