use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use database::{retry_with_backoff, DatabaseConfig, GameStore, MemoryStore, SqliteStore};
use engine::{run_match, MatchConfig, MatchError, MatchService, PlayerConfig, Seat, StrategyKind};
use hub::{HubConfig, HubRegistry};
use rand::{rngs::StdRng, SeedableRng};
use types::{GameOptions, Stage};

#[derive(Parser, Debug)]
struct Params {
    /// YAML match description; overrides the player and role flags
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    player: Vec<String>,
    #[arg(long, value_enum, default_value_t = StrategyKind::Default)]
    strategy: StrategyKind,
    #[arg(long, default_value_t = 1)]
    mafia: u32,
    #[arg(long, default_value_t = 1)]
    doctors: u32,
    #[arg(long, default_value_t = 1)]
    sheriffs: u32,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    database_url: Option<String>,
    /// Keep everything in memory instead of SQLite
    #[arg(long)]
    dry_run: bool,
    #[arg(long, default_value_t = 100)]
    max_turns: u32,
}

impl Params {
    fn match_config(&self) -> Result<MatchConfig, MatchError> {
        if let Some(path) = &self.config {
            return MatchConfig::load(path);
        }
        let options = GameOptions {
            player_count: self.player.len() as u32,
            mafia_count: self.mafia,
            doctor_count: self.doctors,
            sheriff_count: self.sheriffs,
            day_interval_units: 4,
            night_interval_units: 2,
        };
        options.verify()?;
        Ok(MatchConfig {
            options,
            players: self
                .player
                .iter()
                .map(|name| PlayerConfig {
                    name: name.clone(),
                    strategy: self.strategy,
                })
                .collect(),
            seed: self.seed,
            database_url: None,
            max_turns: Some(self.max_turns),
            hub: HubConfig::default(),
        })
    }
}

async fn open_store(args: &Params, config: &MatchConfig) -> Result<Arc<dyn GameStore>, MatchError> {
    if args.dry_run {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let db_config =
        DatabaseConfig::from_cli_or_env_or_yaml(args.database_url.clone(), config.database_url.clone());
    log::info!("database: {}", db_config.url);
    let store = retry_with_backoff(
        "opening the database",
        || {
            let db_config = db_config.clone();
            Box::pin(async move { SqliteStore::connect(&db_config).await })
        },
        3,
        Duration::from_millis(250),
    )
    .await?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<(), MatchError> {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");

    let config = args.match_config()?;
    let store = open_store(&args, &config).await?;
    let hubs = Arc::new(HubRegistry::new(config.hub.clone()));
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let service = MatchService::with_rng(store, hubs, rng);

    let game_id = service.create_match(config.options).await?;
    let mut observer = service.subscribe(game_id).await?;
    let watcher = tokio::spawn(async move {
        while let Some(payload) = observer.receiver.recv().await {
            log::info!("observer: {payload}");
        }
    });

    let names: Vec<String> = config.players.iter().map(|p| p.name.clone()).collect();
    let player_map = service.register_players(game_id, &names).await?;
    let mut seats = config
        .players
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            player_map.get(&p.name).map(|&player_id| Seat {
                player_id,
                strategy: p.strategy.build(config.seed, i),
            })
        })
        .collect::<Vec<_>>();

    let max_turns = config.max_turns.unwrap_or(args.max_turns);
    let game = run_match(&service, game_id, &mut seats, max_turns).await?;

    println!("{game}");
    match game.stage {
        Stage::TownWin | Stage::MafiaWin => println!("{} after {} turns", game.stage, game.turn_count),
        stage => println!("Stopped in {stage} after {} turns", game.turn_count),
    }

    // a retired hub stays registered while the observer is attached
    service.hubs().remove(game_id);
    let _ = watcher.await;
    Ok(())
}
