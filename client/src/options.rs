//! Legal actions derived from a battle request.

use rqlink_protocol::BattleRequest;
use serde::Serialize;

/// A usable move, numbered the way `move <slot>` expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOption {
    pub slot: usize,
    pub id: String,
    pub name: String,
    pub pp: u32,
    pub max_pp: u32,
    pub target: String,
}

/// A benched, conscious pokemon, numbered the way `switch <slot>` expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchOption {
    pub slot: usize,
    pub ident: String,
    pub details: String,
    pub condition: String,
}

/// Summary of what the player may do right now.
///
/// Always recomputed from the request it came from; never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BattleOptions {
    pub moves: Vec<MoveOption>,
    pub switches: Vec<SwitchOption>,
    pub can_terastallize: Option<String>,
    pub trapped: bool,
    pub maybe_trapped: bool,
    pub force_switch: bool,
    pub team_preview: bool,
    pub wait: bool,
}

impl BattleOptions {
    pub fn from_request(request: &BattleRequest) -> Self {
        if request.wait {
            return Self {
                wait: true,
                ..Self::default()
            };
        }

        let active = request.first_active();

        let moves = active
            .map(|active| {
                active
                    .moves
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| !m.disabled)
                    .map(|(i, m)| MoveOption {
                        slot: i + 1,
                        id: m.id.clone(),
                        name: m.name.clone(),
                        pp: m.pp,
                        max_pp: m.max_pp,
                        target: m.target.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let switches = request
            .side
            .as_ref()
            .map(|side| {
                side.pokemon
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| !p.active && !p.is_fainted())
                    .map(|(i, p)| SwitchOption {
                        slot: i + 1,
                        ident: p.ident.clone(),
                        details: p.details.clone(),
                        condition: p.condition.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            moves,
            switches,
            can_terastallize: active.and_then(|a| a.can_terastallize.clone()),
            trapped: active.is_some_and(|a| a.trapped),
            maybe_trapped: active.is_some_and(|a| a.maybe_trapped),
            force_switch: request.is_force_switch(),
            team_preview: request.team_preview,
            wait: false,
        }
    }
}

impl From<&BattleRequest> for BattleOptions {
    fn from(request: &BattleRequest) -> Self {
        Self::from_request(request)
    }
}
