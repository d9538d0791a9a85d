use database::DatabaseError;
use hub::HubError;
use thiserror::Error;
use types::{GameId, OptionsError, RuleError};

/// Coarse classification callers map onto their own responses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Internal,
    Storage,
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Invalid game options: {0}")]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("Game {0} not found")]
    GameNotFound(GameId),

    #[error("Unknown move type {0}")]
    UnknownMoveType(u8),

    #[error("Id allocation failed: {0}")]
    Allocation(DatabaseError),

    #[error("Corrupt stored record: {0}")]
    CorruptRecord(String),

    #[error("Storage error: {0}")]
    Storage(DatabaseError),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<DatabaseError> for MatchError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::GameNotFound(game_id) => MatchError::GameNotFound(game_id),
            DatabaseError::CounterNotFound(_)
            | DatabaseError::IdSpaceExhausted(_)
            | DatabaseError::RetryExhausted(_) => MatchError::Allocation(e),
            other => MatchError::Storage(other),
        }
    }
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchError::Options(_) | MatchError::UnknownMoveType(_) => ErrorKind::Validation,
            MatchError::Rule(rule) => match rule {
                RuleError::InvalidMove(_)
                | RuleError::UnknownTarget { .. }
                | RuleError::EmptyName
                | RuleError::RosterIncomplete { .. }
                | RuleError::StageClosed { .. } => ErrorKind::Validation,
                RuleError::CannotChangeMove(_)
                | RuleError::DuplicateName(_)
                | RuleError::RosterFull(_) => ErrorKind::Conflict,
                RuleError::UnknownPlayer { .. } => ErrorKind::NotFound,
                RuleError::NoRolesRemaining(_) => ErrorKind::Internal,
            },
            MatchError::GameNotFound(_) | MatchError::Hub(HubError::HubNotFound(_)) => {
                ErrorKind::NotFound
            }
            MatchError::Hub(_)
            | MatchError::Allocation(_)
            | MatchError::CorruptRecord(_)
            | MatchError::Config(_) => ErrorKind::Internal,
            MatchError::Storage(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            MatchError::from(RuleError::CannotChangeMove(3)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            MatchError::from(RuleError::DuplicateName("ann".to_string())).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            MatchError::from(RuleError::InvalidMove("dead".to_string())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            MatchError::from(OptionsError::ResidualBits(1)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            MatchError::from(HubError::HubNotFound(4)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MatchError::from(RuleError::NoRolesRemaining(4)).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_database_errors_are_split() {
        assert_eq!(
            MatchError::from(DatabaseError::CounterNotFound("games".to_string())).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            MatchError::from(DatabaseError::Query("disk full".to_string())).kind(),
            ErrorKind::Storage
        );
        assert!(matches!(
            MatchError::from(DatabaseError::GameNotFound(9)),
            MatchError::GameNotFound(9)
        ));
    }
}
