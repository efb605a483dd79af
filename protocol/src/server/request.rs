//! The JSON payload of `|request|`.
//!
//! Unknown keys are ignored and every field the server may omit has a
//! default, so requests from newer servers still parse.

use serde::{Deserialize, Deserializer, Serialize};

/// A decision point. The choice answering it must quote `rqid`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rqid: Option<u64>,

    /// One entry per active slot; absent on switch-only and wait requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<Vec<ActivePokemon>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<SideInfo>,

    /// Per-slot flags, set when that slot must switch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_switch: Option<Vec<bool>>,

    #[serde(default)]
    pub team_preview: bool,

    /// Nothing to decide until the opponent moves
    #[serde(default)]
    pub wait: bool,

    #[serde(default)]
    pub no_cancel: bool,
}

impl BattleRequest {
    pub fn needs_decision(&self) -> bool {
        !self.wait && (self.team_preview || self.is_force_switch() || self.active.is_some())
    }

    pub fn is_force_switch(&self) -> bool {
        self.force_switch
            .as_deref()
            .is_some_and(|slots| slots.contains(&true))
    }

    /// The only active slot in singles
    pub fn first_active(&self) -> Option<&ActivePokemon> {
        self.active.as_deref().and_then(<[_]>::first)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePokemon {
    #[serde(default)]
    pub moves: Vec<MoveSlot>,

    #[serde(default)]
    pub trapped: bool,

    #[serde(default)]
    pub maybe_trapped: bool,

    /// Tera type, present only while terastallizing is allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_terastallize: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MoveSlot {
    #[serde(rename = "move")]
    pub name: String,

    pub id: String,

    // Recharge and other pseudo-moves carry no pp
    #[serde(default)]
    pub pp: u32,

    #[serde(rename = "maxpp", default)]
    pub max_pp: u32,

    #[serde(default)]
    pub target: String,

    #[serde(default, deserialize_with = "flag_or_reason")]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SideInfo {
    #[serde(default)]
    pub name: String,

    /// `p1` or `p2`
    #[serde(default)]
    pub id: String,

    /// Team order; switch slots count from 1 in this order
    #[serde(default)]
    pub pokemon: Vec<SidePokemon>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SidePokemon {
    /// e.g. `p1: Pikachu`
    pub ident: String,
    /// e.g. `Pikachu, L88, M`
    pub details: String,
    /// `HP/MAXHP STATUS`, or `0 fnt`
    pub condition: String,

    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub moves: Vec<String>,

    #[serde(default)]
    pub item: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teratype: Option<String>,
}

impl SidePokemon {
    pub fn is_fainted(&self) -> bool {
        self.condition.ends_with("fnt")
    }
}

/// `disabled` arrives as a bool, or as the name of whatever disables the move
fn flag_or_reason<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Reason(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Reason(reason) => !reason.is_empty(),
    })
}
