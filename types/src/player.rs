use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::{game_state::PublicInfo, Role};

pub type GameId = u32;
pub type PlayerId = u32;

/// Picks a move target for one player. `None` abstains.
pub trait Strategy: Debug + Send {
    fn select_target(&mut self, me: &Player, public_info: &PublicInfo) -> Option<PlayerId>;

    fn observe_investigation(&mut self, _target: PlayerId, _is_mafia: bool) {}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
}

impl Player {
    /// An open roster slot: no name, no role yet.
    pub fn new_slot(game_id: GameId, player_id: PlayerId) -> Self {
        Self {
            game_id,
            player_id,
            name: String::new(),
            role: None,
            alive: true,
        }
    }

    pub fn is_registered(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn is_mafia(&self) -> bool {
        self.role.is_some_and(Role::is_mafia)
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_registered() {
            write!(f, "{} (#{})", self.name, self.player_id)
        } else {
            write!(f, "<open slot #{}>", self.player_id)
        }
    }
}
