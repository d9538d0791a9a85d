use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(u32),

    #[error("Game not found: {0}")]
    GameNotFound(u32),

    #[error("Move not found: game {game_id}, turn {turn_count}, player {player_id}")]
    MoveNotFound {
        game_id: u32,
        turn_count: u32,
        player_id: u32,
    },

    #[error("No id counter for namespace {0}")]
    CounterNotFound(String),

    #[error("Every id in namespace {0} is taken")]
    IdSpaceExhausted(String),

    #[error("Retry exhausted: {0}")]
    RetryExhausted(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        DatabaseError::Query(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migration(e.to_string())
    }
}
