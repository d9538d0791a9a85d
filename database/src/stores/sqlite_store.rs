use super::GameStore;
use crate::config::DatabaseConfig;
use crate::models::{GameChanges, GameRecord, IdCounter, MoveRecord, Namespace, PlayerRecord};
use crate::DatabaseError;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = config
            .create_pool()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        let store = Self::new(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::debug!("migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn game_from_row(r: &SqliteRow) -> Result<GameRecord, sqlx::Error> {
    Ok(GameRecord {
        game_id: r.try_get("game_id")?,
        stage: r.try_get("stage")?,
        started: r.try_get("started")?,
        modified: r.try_get("modified")?,
        stage_finish: r.try_get("stage_finish")?,
        turn_count: r.try_get("turn_count")?,
        options: r.try_get("options")?,
    })
}

fn player_from_row(r: &SqliteRow) -> Result<PlayerRecord, sqlx::Error> {
    Ok(PlayerRecord {
        game_id: r.try_get("game_id")?,
        player_id: r.try_get("player_id")?,
        name: r.try_get("name")?,
        role: r.try_get("role")?,
        alive: r.try_get("alive")?,
    })
}

fn move_from_row(r: &SqliteRow) -> Result<MoveRecord, sqlx::Error> {
    Ok(MoveRecord {
        game_id: r.try_get("game_id")?,
        turn_count: r.try_get("turn_count")?,
        player_id: r.try_get("player_id")?,
        target_id: r.try_get("target_id")?,
        move_type: r.try_get("move_type")?,
        time: r.try_get("time")?,
    })
}

const MOVE_COLUMNS: &str = "game_id, turn_count, player_id, target_id, move_type, time";

#[async_trait::async_trait]
impl GameStore for SqliteStore {
    async fn load_counter(&self, namespace: Namespace) -> Result<Option<IdCounter>, DatabaseError> {
        let row = sqlx::query("SELECT count, scale, add_const FROM counters WHERE namespace = ?")
            .bind(namespace.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        Ok(match row {
            Some(r) => Some(IdCounter {
                namespace,
                count: r.try_get("count")?,
                scale: r.try_get("scale")?,
                add_const: r.try_get("add_const")?,
            }),
            None => None,
        })
    }

    async fn insert_counter(&self, counter: &IdCounter) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT OR REPLACE INTO counters (namespace, count, scale, add_const) VALUES (?, ?, ?, ?)",
        )
        .bind(counter.namespace.as_str())
        .bind(counter.count)
        .bind(counter.scale)
        .bind(counter.add_const)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn compare_and_set_count(
        &self,
        namespace: Namespace,
        expected: u32,
        new: u32,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE counters SET count = ? WHERE namespace = ? AND count = ?")
            .bind(new)
            .bind(namespace.as_str())
            .bind(expected)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn id_exists(&self, namespace: Namespace, id: u32) -> Result<bool, DatabaseError> {
        // table and column names come from the closed Namespace enum
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
            namespace.as_str(),
            namespace.id_column()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn insert_game(&self, game: &GameRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO games (game_id, stage, started, modified, stage_finish, turn_count, options) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(game.game_id)
        .bind(game.stage)
        .bind(game.started)
        .bind(game.modified)
        .bind(game.stage_finish)
        .bind(game.turn_count)
        .bind(game.options)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn update_game(&self, game: &GameRecord) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE games SET stage = ?, started = ?, modified = ?, stage_finish = ?, turn_count = ? WHERE game_id = ?",
        )
        .bind(game.stage)
        .bind(game.started)
        .bind(game.modified)
        .bind(game.stage_finish)
        .bind(game.turn_count)
        .bind(game.game_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::GameNotFound(game.game_id));
        }
        Ok(())
    }

    async fn get_game(&self, game_id: u32) -> Result<Option<GameRecord>, DatabaseError> {
        let row = sqlx::query(
            "SELECT game_id, stage, started, modified, stage_finish, turn_count, options FROM games WHERE game_id = ?",
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        Ok(match row {
            Some(r) => Some(game_from_row(&r)?),
            None => None,
        })
    }

    async fn insert_players(&self, players: &[PlayerRecord]) -> Result<(), DatabaseError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))?;

        for player in players {
            sqlx::query(
                "INSERT INTO players (player_id, game_id, name, role, alive) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(player.player_id)
            .bind(player.game_id)
            .bind(&player.name)
            .bind(player.role)
            .bind(player.alive)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn update_player(&self, player: &PlayerRecord) -> Result<(), DatabaseError> {
        let result =
            sqlx::query("UPDATE players SET name = ?, role = ?, alive = ? WHERE player_id = ?")
                .bind(&player.name)
                .bind(player.role)
                .bind(player.alive)
                .bind(player.player_id)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::PlayerNotFound(player.player_id));
        }
        Ok(())
    }

    async fn get_game_players(&self, game_id: u32) -> Result<Vec<PlayerRecord>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT game_id, player_id, name, role, alive FROM players WHERE game_id = ? ORDER BY player_id",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| player_from_row(r).map_err(DatabaseError::from))
            .collect()
    }

    async fn insert_move(&self, mv: &MoveRecord) -> Result<(), DatabaseError> {
        sqlx::query(&format!(
            "INSERT INTO moves ({MOVE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(mv.game_id)
        .bind(mv.turn_count)
        .bind(mv.player_id)
        .bind(mv.target_id)
        .bind(mv.move_type)
        .bind(mv.time)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn update_move(&self, mv: &MoveRecord) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE moves SET target_id = ?, move_type = ?, time = ? WHERE game_id = ? AND turn_count = ? AND player_id = ?",
        )
        .bind(mv.target_id)
        .bind(mv.move_type)
        .bind(mv.time)
        .bind(mv.game_id)
        .bind(mv.turn_count)
        .bind(mv.player_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::MoveNotFound {
                game_id: mv.game_id,
                turn_count: mv.turn_count,
                player_id: mv.player_id,
            });
        }
        Ok(())
    }

    async fn get_game_moves(&self, game_id: u32) -> Result<Vec<MoveRecord>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVE_COLUMNS} FROM moves WHERE game_id = ? ORDER BY turn_count, player_id"
        ))
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| move_from_row(r).map_err(DatabaseError::from))
            .collect()
    }

    async fn get_turn_moves(
        &self,
        game_id: u32,
        turn_count: u32,
    ) -> Result<Vec<MoveRecord>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVE_COLUMNS} FROM moves WHERE game_id = ? AND turn_count = ? ORDER BY player_id"
        ))
        .bind(game_id)
        .bind(turn_count)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| move_from_row(r).map_err(DatabaseError::from))
            .collect()
    }

    async fn save_changes(&self, changes: &GameChanges) -> Result<(), DatabaseError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))?;

        for player in &changes.players {
            let result =
                sqlx::query("UPDATE players SET name = ?, role = ?, alive = ? WHERE player_id = ?")
                    .bind(&player.name)
                    .bind(player.role)
                    .bind(player.alive)
                    .bind(player.player_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DatabaseError::Query(e.to_string()))?;
            if result.rows_affected() == 0 {
                return Err(DatabaseError::PlayerNotFound(player.player_id));
            }
        }

        for mv in &changes.new_moves {
            sqlx::query(&format!(
                "INSERT INTO moves ({MOVE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
            ))
            .bind(mv.game_id)
            .bind(mv.turn_count)
            .bind(mv.player_id)
            .bind(mv.target_id)
            .bind(mv.move_type)
            .bind(mv.time)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        }

        for mv in &changes.changed_moves {
            let result = sqlx::query(
                "UPDATE moves SET target_id = ?, move_type = ?, time = ? WHERE game_id = ? AND turn_count = ? AND player_id = ?",
            )
            .bind(mv.target_id)
            .bind(mv.move_type)
            .bind(mv.time)
            .bind(mv.game_id)
            .bind(mv.turn_count)
            .bind(mv.player_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
            if result.rows_affected() == 0 {
                return Err(DatabaseError::MoveNotFound {
                    game_id: mv.game_id,
                    turn_count: mv.turn_count,
                    player_id: mv.player_id,
                });
            }
        }

        let game = &changes.game;
        let result = sqlx::query(
            "UPDATE games SET stage = ?, started = ?, modified = ?, stage_finish = ?, turn_count = ? WHERE game_id = ?",
        )
        .bind(game.stage)
        .bind(game.started)
        .bind(game.modified)
        .bind(game.stage_finish)
        .bind(game.turn_count)
        .bind(game.game_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::GameNotFound(game.game_id));
        }

        // dropping tx without commit rolls everything back on the error paths above
        tx.commit()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    pub async fn setup_test_store() -> SqliteStore {
        // a second connection would see a different in-memory database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database pool");
        let store = SqliteStore::new(pool);
        store
            .run_migrations()
            .await
            .expect("Failed to run test migrations");
        store
    }

    fn game(game_id: u32) -> GameRecord {
        let now = Utc::now();
        GameRecord {
            game_id,
            stage: -1,
            started: now,
            modified: now,
            stage_finish: None,
            turn_count: 0,
            options: 0x1234,
        }
    }

    #[tokio::test]
    async fn test_counters_are_seeded() {
        let store = setup_test_store().await;
        let counter = store
            .load_counter(Namespace::Players)
            .await
            .unwrap()
            .expect("players counter missing");
        assert_eq!(counter, IdCounter::seed(Namespace::Players));
    }

    #[tokio::test]
    async fn test_compare_and_set_count() {
        let store = setup_test_store().await;
        assert!(store
            .compare_and_set_count(Namespace::Games, 0, 3)
            .await
            .unwrap());
        assert!(!store
            .compare_and_set_count(Namespace::Games, 0, 4)
            .await
            .unwrap());
        let counter = store.load_counter(Namespace::Games).await.unwrap().unwrap();
        assert_eq!(counter.count, 3);
    }

    #[tokio::test]
    async fn test_game_player_and_move_rows() {
        let store = setup_test_store().await;
        let mut record = game(77);
        store.insert_game(&record).await.unwrap();
        assert!(store.id_exists(Namespace::Games, 77).await.unwrap());
        assert!(!store.id_exists(Namespace::Games, 78).await.unwrap());

        record.stage = 1;
        record.turn_count = 1;
        record.stage_finish = Some(Utc::now());
        store.update_game(&record).await.unwrap();
        let loaded = store.get_game(77).await.unwrap().unwrap();
        assert_eq!(loaded.stage, 1);
        assert_eq!(loaded.turn_count, 1);
        assert_eq!(loaded.options, 0x1234);
        assert!(store.get_game(78).await.unwrap().is_none());

        let players: Vec<PlayerRecord> = [9, 4]
            .into_iter()
            .map(|player_id| PlayerRecord {
                game_id: 77,
                player_id,
                name: String::new(),
                role: 0,
                alive: true,
            })
            .collect();
        store.insert_players(&players).await.unwrap();
        let mut named = players[0].clone();
        named.name = "ann".to_string();
        named.role = 2;
        store.update_player(&named).await.unwrap();
        let loaded = store.get_game_players(77).await.unwrap();
        assert_eq!(loaded.iter().map(|p| p.player_id).collect::<Vec<_>>(), vec![4, 9]);
        assert_eq!(loaded[1], named);

        let mut mv = MoveRecord {
            game_id: 77,
            turn_count: 1,
            player_id: 9,
            target_id: 4,
            move_type: 2,
            time: Utc::now(),
        };
        store.insert_move(&mv).await.unwrap();
        mv.target_id = 0;
        store.update_move(&mv).await.unwrap();
        let moves = store.get_turn_moves(77, 1).await.unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].target_id, 0);
        assert!(store.get_turn_moves(77, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_updates_report_missing_rows() {
        let store = setup_test_store().await;
        assert!(matches!(
            store.update_game(&game(5)).await,
            Err(DatabaseError::GameNotFound(5))
        ));
        let player = PlayerRecord {
            game_id: 5,
            player_id: 6,
            name: "ghost".to_string(),
            role: 1,
            alive: true,
        };
        assert!(matches!(
            store.update_player(&player).await,
            Err(DatabaseError::PlayerNotFound(6))
        ));
    }

    #[tokio::test]
    async fn test_failed_save_changes_nothing() {
        let store = setup_test_store().await;
        let record = game(31);
        store.insert_game(&record).await.unwrap();
        let player = PlayerRecord {
            game_id: 31,
            player_id: 8,
            name: "ann".to_string(),
            role: 1,
            alive: true,
        };
        store.insert_players(&[player.clone()]).await.unwrap();
        let existing = MoveRecord {
            game_id: 31,
            turn_count: 1,
            player_id: 8,
            target_id: 0,
            move_type: 1,
            time: Utc::now(),
        };
        store.insert_move(&existing).await.unwrap();

        let mut changes = GameChanges {
            game: GameRecord {
                stage: 2,
                turn_count: 2,
                ..record.clone()
            },
            players: vec![PlayerRecord {
                alive: false,
                ..player.clone()
            }],
            // already stored, so the insert fails after the player update ran
            new_moves: vec![existing.clone()],
            changed_moves: Vec::new(),
        };
        assert!(store.save_changes(&changes).await.is_err());
        assert_eq!(store.get_game_players(31).await.unwrap(), vec![player.clone()]);
        assert_eq!(store.get_game(31).await.unwrap().unwrap().turn_count, 0);

        changes.new_moves.clear();
        store.save_changes(&changes).await.unwrap();
        assert!(!store.get_game_players(31).await.unwrap()[0].alive);
        assert_eq!(store.get_game(31).await.unwrap().unwrap().stage, 2);
    }
}
