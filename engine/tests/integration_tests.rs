//! Whole matches driven through the service, over both stores.

use std::sync::Arc;
use std::time::Duration;

use database::{DatabaseConfig, GameStore, MemoryStore, SqliteStore};
use engine::{run_match, ErrorKind, MatchError, MatchService, Seat};
use hub::{HubConfig, HubRegistry, Subscription};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::Value;
use strategies::{DefaultStrategy, RandomStrategy};
use types::{Game, GameOptions, MoveKind, PlayerId, Role, Stage};

fn options(players: u32, mafia: u32, doctors: u32, sheriffs: u32) -> GameOptions {
    GameOptions {
        player_count: players,
        mafia_count: mafia,
        doctor_count: doctors,
        sheriff_count: sheriffs,
        day_interval_units: 4,
        night_interval_units: 2,
    }
}

fn service_over(store: Arc<dyn GameStore>) -> MatchService {
    let hubs = Arc::new(HubRegistry::new(HubConfig { queue_capacity: 64 }));
    MatchService::with_rng(store, hubs, StdRng::seed_from_u64(7))
}

fn memory_service() -> MatchService {
    service_over(Arc::new(MemoryStore::new()))
}

fn names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("player{i}")).collect()
}

fn with_role(game: &Game, role: Role) -> Vec<PlayerId> {
    game.players
        .iter()
        .filter(|p| p.role == Some(role))
        .map(|p| p.player_id)
        .collect()
}

/// Reads events until one named `event` arrives, returning everything seen.
async fn events_until(subscription: &mut Subscription, event: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    loop {
        let payload = tokio::time::timeout(Duration::from_secs(5), subscription.receiver.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("hub closed the queue");
        let value: Value = serde_json::from_str(&payload).unwrap();
        let done = value["event"] == event;
        seen.push(value);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn test_registration_starts_the_night() {
    let service = memory_service();
    let game_id = service.create_match(options(5, 1, 1, 1)).await.unwrap();
    assert_ne!(game_id, 0);

    let player_map = service.register_players(game_id, &names(5)).await.unwrap();
    assert_eq!(player_map.len(), 5);

    let game = service.get_match(game_id).await.unwrap();
    assert_eq!(game.stage, Stage::Night);
    assert_eq!(game.turn_count, 1);
    assert!(game.stage_finish.is_some());
    assert_eq!(with_role(&game, Role::Mafia).len(), 1);
    assert_eq!(with_role(&game, Role::Doctor).len(), 1);
    assert_eq!(with_role(&game, Role::Sheriff).len(), 1);
    assert_eq!(with_role(&game, Role::Villager).len(), 2);

    let err = service.register_player(game_id, "late").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_duplicate_name_is_a_conflict() {
    let service = memory_service();
    let game_id = service.create_match(options(3, 1, 0, 0)).await.unwrap();
    service.register_player(game_id, "ann").await.unwrap();
    let err = service.register_player(game_id, "ann").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_scripted_match_town_wins() {
    let service = memory_service();
    let game_id = service.create_match(options(4, 1, 0, 1)).await.unwrap();
    let mut observer = service.subscribe(game_id).await.unwrap();
    service.register_players(game_id, &names(4)).await.unwrap();

    let game = service.get_match(game_id).await.unwrap();
    let mafia = with_role(&game, Role::Mafia)[0];
    let sheriff = with_role(&game, Role::Sheriff)[0];
    let villagers = with_role(&game, Role::Villager);
    assert_eq!(villagers.len(), 2);

    let investigation = service
        .submit_move(game_id, sheriff, mafia, MoveKind::Night(Role::Sheriff).code())
        .await
        .unwrap();
    assert_eq!(investigation.investigation, Some(true));

    // sheriffs are stuck with their first pick
    let err = service
        .submit_move(game_id, sheriff, villagers[0], MoveKind::Night(Role::Sheriff).code())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    service
        .submit_move(game_id, mafia, villagers[0], Role::Mafia.code())
        .await
        .unwrap();
    service
        .submit_move(game_id, villagers[0], 0, Role::Villager.code())
        .await
        .unwrap();
    let last = service
        .submit_move(game_id, villagers[1], 0, Role::Villager.code())
        .await
        .unwrap();
    let report = last.stage.expect("night should resolve once everyone moved");
    assert_eq!(report.to, Stage::Day);
    assert_eq!(report.eliminated, Some(villagers[0]));

    // the dead cannot vote
    let err = service
        .submit_move(game_id, villagers[0], mafia, MoveKind::Lynch.code())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    service.submit_move(game_id, sheriff, mafia, 0).await.unwrap();
    service.submit_move(game_id, mafia, sheriff, 0).await.unwrap();
    let last = service.submit_move(game_id, villagers[1], mafia, 0).await.unwrap();
    assert_eq!(last.eliminated(), Some(mafia));

    let game = service.get_match(game_id).await.unwrap();
    assert_eq!(game.stage, Stage::TownWin);
    assert_eq!(game.stage_finish, None);

    let events = events_until(&mut observer, "Victory").await;
    let count = |name: &str| events.iter().filter(|e| e["event"] == name).count();
    assert_eq!(count("Player"), 4);
    assert_eq!(count("Turn"), 2);
    assert_eq!(count("Move"), 7);
    assert_eq!(events.last().unwrap()["data"], i64::from(Stage::TownWin.code()));

    // finished matches take no more moves
    let err = service
        .submit_move(game_id, sheriff, 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_stage_deadline_forces_progress() {
    let service = memory_service();
    let game_id = service.create_match(options(3, 1, 0, 0)).await.unwrap();
    service.register_players(game_id, &names(3)).await.unwrap();

    // nobody moved, so the night passes without a kill
    let report = service.progress_stage(game_id).await.unwrap();
    assert_eq!(report.from, Stage::Night);
    assert_eq!(report.to, Stage::Day);
    assert_eq!(report.eliminated, None);
    assert!(service.current_moves(game_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_game_and_player() {
    let service = memory_service();
    let err = service.get_match(12345).await.unwrap_err();
    assert!(matches!(err, MatchError::GameNotFound(12345)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        service.subscribe(12345).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let game_id = service.create_match(options(3, 1, 0, 0)).await.unwrap();
    let player_map = service.register_players(game_id, &names(3)).await.unwrap();
    let stranger = player_map.values().max().unwrap() + 1;
    let err = service
        .submit_move(game_id, stranger, 0, Role::Villager.code())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service.submit_move(game_id, stranger, 0, 9).await.unwrap_err();
    assert!(matches!(err, MatchError::UnknownMoveType(9)));
}

#[tokio::test]
async fn test_random_match_over_memory() {
    let service = memory_service();
    let game_id = service.create_match(options(7, 2, 1, 1)).await.unwrap();
    let player_map = service.register_players(game_id, &names(7)).await.unwrap();

    let mut seats: Vec<Seat> = player_map
        .values()
        .enumerate()
        .map(|(i, &player_id)| Seat {
            player_id,
            strategy: Box::new(RandomStrategy::with_seed(100 + i as u64)),
        })
        .collect();

    let max_turns = 60;
    let game = run_match(&service, game_id, &mut seats, max_turns).await.unwrap();
    assert!(game.stage.is_terminal() || game.turn_count > max_turns);
    if game.stage.is_terminal() {
        let living_mafia = game.living_players().filter(|p| p.is_mafia()).count();
        match game.stage {
            Stage::TownWin => assert_eq!(living_mafia, 0),
            Stage::MafiaWin => assert_eq!(game.living_players().count(), living_mafia),
            _ => unreachable!(),
        }
    }
}

#[tokio::test]
async fn test_default_match_over_sqlite() {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        pool_size: 1,
    };
    let store = SqliteStore::connect(&config).await.unwrap();
    let service = service_over(Arc::new(store));

    let game_id = service.create_match(options(5, 1, 1, 1)).await.unwrap();
    let player_map = service.register_players(game_id, &names(5)).await.unwrap();
    let mut seats: Vec<Seat> = player_map
        .values()
        .map(|&player_id| Seat {
            player_id,
            strategy: Box::new(DefaultStrategy::default()),
        })
        .collect();

    let game = run_match(&service, game_id, &mut seats, 40).await.unwrap();
    assert!(game.turn_count >= 2);

    let reloaded = service.get_match(game_id).await.unwrap();
    assert_eq!(reloaded, game);
    assert!(!reloaded.moves.is_empty());
}
