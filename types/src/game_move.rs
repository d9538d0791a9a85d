use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GameId, MoveKind, PlayerId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub game_id: GameId,
    pub turn_count: u32,
    pub player_id: PlayerId,
    pub target_id: Option<PlayerId>,
    pub kind: MoveKind,
    pub time: DateTime<Utc>,
}

impl Move {
    pub fn sort_key(&self) -> (u32, PlayerId) {
        (self.turn_count, self.player_id)
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target_id {
            Some(target) => write!(
                f,
                "turn {}: #{} {} -> #{}",
                self.turn_count, self.player_id, self.kind, target
            ),
            None => write!(
                f,
                "turn {}: #{} {} (no target)",
                self.turn_count, self.player_id, self.kind
            ),
        }
    }
}
