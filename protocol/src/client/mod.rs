/// Commands that clients can send to server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// /trn USERNAME,0,ASSERTION
    TrustedLogin { username: String, assertion: String },

    /// /join ROOMID
    JoinRoom(String),

    /// /utm TEAM
    UpdateTeam(String),

    /// /search FORMAT
    Search(String),

    /// /cancelsearch
    CancelSearch,

    /// /timer on|off
    Timer(bool),

    /// /choose CHOICE|RQID
    Choose { choice: String, rqid: u64 },
}

impl ClientCommand {
    /// Serialize command to protocol format
    pub fn to_protocol_string(&self) -> String {
        match self {
            Self::TrustedLogin {
                username,
                assertion,
            } => format!("/trn {},0,{}", username, assertion),
            Self::JoinRoom(room) => format!("/join {}", room),
            Self::UpdateTeam(team) => format!("/utm {}", team),
            Self::Search(format) => format!("/search {}", format),
            Self::CancelSearch => "/cancelsearch".to_string(),
            Self::Timer(on) => format!("/timer {}", if *on { "on" } else { "off" }),
            Self::Choose { choice, rqid } => format!("/choose {}|{}", choice, rqid),
        }
    }
}

/// Client message with optional room context
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    pub room_id: Option<String>,
    pub command: ClientCommand,
}

impl ClientMessage {
    /// A command sent outside of any room
    pub fn global(command: ClientCommand) -> Self {
        Self {
            room_id: None,
            command,
        }
    }

    /// A command scoped to one room
    pub fn in_room(room: &str, command: ClientCommand) -> Self {
        Self {
            room_id: Some(room.to_string()),
            command,
        }
    }

    /// Serialize to wire format: ROOMID|TEXT or |TEXT
    pub fn to_wire_format(&self) -> String {
        let text = self.command.to_protocol_string();
        match &self.room_id {
            Some(room) => format!("{}|{}", room, text),
            None => format!("|{}", text),
        }
    }
}
