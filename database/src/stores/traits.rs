use super::super::models::{GameChanges, GameRecord, IdCounter, MoveRecord, Namespace, PlayerRecord};
use super::super::DatabaseError;
use async_trait::async_trait;

/// Persistence for matches and id counters. Reads observe every write the
/// same caller has already completed.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn load_counter(&self, namespace: Namespace) -> Result<Option<IdCounter>, DatabaseError>;
    async fn insert_counter(&self, counter: &IdCounter) -> Result<(), DatabaseError>;
    /// Moves the count from `expected` to `new`. Returns false, changing
    /// nothing, when the stored count is no longer `expected`.
    async fn compare_and_set_count(
        &self,
        namespace: Namespace,
        expected: u32,
        new: u32,
    ) -> Result<bool, DatabaseError>;
    async fn id_exists(&self, namespace: Namespace, id: u32) -> Result<bool, DatabaseError>;

    async fn insert_game(&self, game: &GameRecord) -> Result<(), DatabaseError>;
    async fn update_game(&self, game: &GameRecord) -> Result<(), DatabaseError>;
    async fn get_game(&self, game_id: u32) -> Result<Option<GameRecord>, DatabaseError>;

    async fn insert_players(&self, players: &[PlayerRecord]) -> Result<(), DatabaseError>;
    async fn update_player(&self, player: &PlayerRecord) -> Result<(), DatabaseError>;
    async fn get_game_players(&self, game_id: u32) -> Result<Vec<PlayerRecord>, DatabaseError>;

    async fn insert_move(&self, mv: &MoveRecord) -> Result<(), DatabaseError>;
    async fn update_move(&self, mv: &MoveRecord) -> Result<(), DatabaseError>;
    /// Ordered by turn, then player.
    async fn get_game_moves(&self, game_id: u32) -> Result<Vec<MoveRecord>, DatabaseError>;
    async fn get_turn_moves(
        &self,
        game_id: u32,
        turn_count: u32,
    ) -> Result<Vec<MoveRecord>, DatabaseError>;

    /// Writes players, then moves, then the game row in one transaction.
    async fn save_changes(&self, changes: &GameChanges) -> Result<(), DatabaseError>;
}
