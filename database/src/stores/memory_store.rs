use std::collections::{BTreeMap, HashMap};

use super::GameStore;
use crate::models::{GameChanges, GameRecord, IdCounter, MoveRecord, Namespace, PlayerRecord};
use crate::DatabaseError;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    counters: HashMap<Namespace, IdCounter>,
    games: BTreeMap<u32, GameRecord>,
    players: BTreeMap<u32, PlayerRecord>,
    // keyed by (game, turn, player) so iteration is already in move order
    moves: BTreeMap<(u32, u32, u32), MoveRecord>,
}

/// In-process store for tests and dry runs. Nothing survives the process.
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let counters = [Namespace::Games, Namespace::Players]
            .into_iter()
            .map(|namespace| (namespace, IdCounter::seed(namespace)))
            .collect();
        Self {
            tables: Mutex::new(Tables {
                counters,
                ..Default::default()
            }),
        }
    }

    /// Starts with no counters at all.
    pub fn empty() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn move_key(mv: &MoveRecord) -> (u32, u32, u32) {
    (mv.game_id, mv.turn_count, mv.player_id)
}

#[async_trait::async_trait]
impl GameStore for MemoryStore {
    async fn load_counter(&self, namespace: Namespace) -> Result<Option<IdCounter>, DatabaseError> {
        Ok(self.tables.lock().await.counters.get(&namespace).cloned())
    }

    async fn insert_counter(&self, counter: &IdCounter) -> Result<(), DatabaseError> {
        self.tables
            .lock()
            .await
            .counters
            .insert(counter.namespace, counter.clone());
        Ok(())
    }

    async fn compare_and_set_count(
        &self,
        namespace: Namespace,
        expected: u32,
        new: u32,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.lock().await;
        match tables.counters.get_mut(&namespace) {
            Some(counter) if counter.count == expected => {
                counter.count = new;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DatabaseError::CounterNotFound(namespace.to_string())),
        }
    }

    async fn id_exists(&self, namespace: Namespace, id: u32) -> Result<bool, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(match namespace {
            Namespace::Games => tables.games.contains_key(&id),
            Namespace::Players => tables.players.contains_key(&id),
        })
    }

    async fn insert_game(&self, game: &GameRecord) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        if tables.games.contains_key(&game.game_id) {
            return Err(DatabaseError::Query(format!(
                "game {} already exists",
                game.game_id
            )));
        }
        tables.games.insert(game.game_id, game.clone());
        Ok(())
    }

    async fn update_game(&self, game: &GameRecord) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .games
            .get_mut(&game.game_id)
            .ok_or(DatabaseError::GameNotFound(game.game_id))?;
        // options are fixed at creation
        *stored = GameRecord {
            options: stored.options,
            ..game.clone()
        };
        Ok(())
    }

    async fn get_game(&self, game_id: u32) -> Result<Option<GameRecord>, DatabaseError> {
        Ok(self.tables.lock().await.games.get(&game_id).cloned())
    }

    async fn insert_players(&self, players: &[PlayerRecord]) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        if let Some(taken) = players
            .iter()
            .find(|p| tables.players.contains_key(&p.player_id))
        {
            return Err(DatabaseError::Query(format!(
                "player {} already exists",
                taken.player_id
            )));
        }
        for player in players {
            tables.players.insert(player.player_id, player.clone());
        }
        Ok(())
    }

    async fn update_player(&self, player: &PlayerRecord) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .players
            .get_mut(&player.player_id)
            .ok_or(DatabaseError::PlayerNotFound(player.player_id))?;
        stored.name = player.name.clone();
        stored.role = player.role;
        stored.alive = player.alive;
        Ok(())
    }

    async fn get_game_players(&self, game_id: u32) -> Result<Vec<PlayerRecord>, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .players
            .values()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn insert_move(&self, mv: &MoveRecord) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        let key = move_key(mv);
        if tables.moves.contains_key(&key) {
            return Err(DatabaseError::Query(format!(
                "move for player {} in turn {} already exists",
                mv.player_id, mv.turn_count
            )));
        }
        tables.moves.insert(key, mv.clone());
        Ok(())
    }

    async fn update_move(&self, mv: &MoveRecord) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .moves
            .get_mut(&move_key(mv))
            .ok_or(DatabaseError::MoveNotFound {
                game_id: mv.game_id,
                turn_count: mv.turn_count,
                player_id: mv.player_id,
            })?;
        *stored = mv.clone();
        Ok(())
    }

    async fn get_game_moves(&self, game_id: u32) -> Result<Vec<MoveRecord>, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .moves
            .range((game_id, 0, 0)..=(game_id, u32::MAX, u32::MAX))
            .map(|(_, mv)| mv.clone())
            .collect())
    }

    async fn get_turn_moves(
        &self,
        game_id: u32,
        turn_count: u32,
    ) -> Result<Vec<MoveRecord>, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .moves
            .range((game_id, turn_count, 0)..=(game_id, turn_count, u32::MAX))
            .map(|(_, mv)| mv.clone())
            .collect())
    }

    async fn save_changes(&self, changes: &GameChanges) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;

        // check every row first so a failure leaves the tables untouched
        if let Some(missing) = changes
            .players
            .iter()
            .find(|p| !tables.players.contains_key(&p.player_id))
        {
            return Err(DatabaseError::PlayerNotFound(missing.player_id));
        }
        if let Some(taken) = changes
            .new_moves
            .iter()
            .find(|mv| tables.moves.contains_key(&move_key(mv)))
        {
            return Err(DatabaseError::Query(format!(
                "move for player {} in turn {} already exists",
                taken.player_id, taken.turn_count
            )));
        }
        if let Some(mv) = changes
            .changed_moves
            .iter()
            .find(|mv| !tables.moves.contains_key(&move_key(mv)))
        {
            return Err(DatabaseError::MoveNotFound {
                game_id: mv.game_id,
                turn_count: mv.turn_count,
                player_id: mv.player_id,
            });
        }
        let options = tables
            .games
            .get(&changes.game.game_id)
            .map(|g| g.options)
            .ok_or(DatabaseError::GameNotFound(changes.game.game_id))?;

        for player in &changes.players {
            if let Some(stored) = tables.players.get_mut(&player.player_id) {
                stored.name = player.name.clone();
                stored.role = player.role;
                stored.alive = player.alive;
            }
        }
        for mv in changes.new_moves.iter().chain(&changes.changed_moves) {
            tables.moves.insert(move_key(mv), mv.clone());
        }
        tables.games.insert(
            changes.game.game_id,
            GameRecord {
                options,
                ..changes.game.clone()
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mv(turn_count: u32, player_id: u32) -> MoveRecord {
        MoveRecord {
            game_id: 1,
            turn_count,
            player_id,
            target_id: 0,
            move_type: 0,
            time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_moves_come_back_in_turn_then_player_order() {
        let store = MemoryStore::new();
        for (turn, player) in [(2, 5), (1, 9), (2, 1), (1, 3)] {
            store.insert_move(&mv(turn, player)).await.unwrap();
        }
        let keys: Vec<_> = store
            .get_game_moves(1)
            .await
            .unwrap()
            .iter()
            .map(|m| (m.turn_count, m.player_id))
            .collect();
        assert_eq!(keys, vec![(1, 3), (1, 9), (2, 1), (2, 5)]);
        assert_eq!(store.get_turn_moves(1, 2).await.unwrap().len(), 2);
        assert!(store.insert_move(&mv(1, 3)).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_save_changes_nothing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let game = GameRecord {
            game_id: 1,
            stage: 1,
            started: now,
            modified: now,
            stage_finish: None,
            turn_count: 1,
            options: 7,
        };
        store.insert_game(&game).await.unwrap();
        let player = PlayerRecord {
            game_id: 1,
            player_id: 3,
            name: "ann".to_string(),
            role: 1,
            alive: true,
        };
        store.insert_players(&[player.clone()]).await.unwrap();

        let changes = GameChanges {
            game: GameRecord {
                turn_count: 2,
                ..game.clone()
            },
            players: vec![PlayerRecord {
                alive: false,
                ..player.clone()
            }],
            new_moves: vec![mv(1, 3)],
            changed_moves: vec![mv(1, 4)],
        };
        assert!(matches!(
            store.save_changes(&changes).await,
            Err(DatabaseError::MoveNotFound { player_id: 4, .. })
        ));
        assert_eq!(store.get_game_players(1).await.unwrap(), vec![player]);
        assert!(store.get_game_moves(1).await.unwrap().is_empty());
        assert_eq!(store.get_game(1).await.unwrap().unwrap().turn_count, 1);
    }

    #[tokio::test]
    async fn test_empty_store_has_no_counters() {
        let store = MemoryStore::empty();
        assert!(store.load_counter(Namespace::Games).await.unwrap().is_none());
        assert!(matches!(
            store.compare_and_set_count(Namespace::Games, 0, 1).await,
            Err(DatabaseError::CounterNotFound(_))
        ));
    }
}
