use thiserror::Error;

use crate::{GameId, PlayerId, Stage};

/// A request the game rules refuse. Nothing is mutated when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("PlayerID {player_id} not found in GameID {game_id}")]
    UnknownPlayer { game_id: GameId, player_id: PlayerId },

    #[error("Target {target_id} not found in GameID {game_id}")]
    UnknownTarget { game_id: GameId, target_id: PlayerId },

    #[error("Sheriff {0} cannot change their move")]
    CannotChangeMove(PlayerId),

    #[error("Cannot have two players with the same name: {0}")]
    DuplicateName(String),

    #[error("Player names cannot be empty")]
    EmptyName,

    #[error("GameID {0} has no open player slots")]
    RosterFull(GameId),

    #[error("GameID {game_id} cannot start: {unnamed} player slots are still open")]
    RosterIncomplete { game_id: GameId, unnamed: usize },

    #[error("No roles left to assign in GameID {0}")]
    NoRolesRemaining(GameId),

    #[error("GameID {game_id} is not accepting moves during {stage}")]
    StageClosed { game_id: GameId, stage: Stage },
}
