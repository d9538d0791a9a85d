use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use database::{GameChanges, GameStore, IdAllocator, Namespace};
use hub::{HubError, HubRegistry, SubscriberId, Subscription};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use tokio::sync::Mutex;
use types::{Game, GameId, GameOptions, Move, MoveKind, MoveOutcome, PlayerId, Registration, StageReport};

use crate::records::{game_from_records, game_record, move_from_record, move_record, player_record};
use crate::MatchError;

/// The operations the application calls. Each one loads the match, applies
/// the rule on the aggregate, writes back what changed in one store
/// transaction and tells observers.
///
/// Concurrent writers to the same match are not serialized here.
pub struct MatchService {
    store: Arc<dyn GameStore>,
    ids: IdAllocator,
    hubs: Arc<HubRegistry>,
    rng: Mutex<StdRng>,
}

impl MatchService {
    pub fn new(store: Arc<dyn GameStore>, hubs: Arc<HubRegistry>) -> Self {
        Self::with_rng(store, hubs, StdRng::from_entropy())
    }

    /// Role draws come from `rng`, so a seeded generator gives repeatable deals.
    pub fn with_rng(store: Arc<dyn GameStore>, hubs: Arc<HubRegistry>, rng: StdRng) -> Self {
        Self {
            ids: IdAllocator::new(store.clone()),
            store,
            hubs,
            rng: Mutex::new(rng),
        }
    }

    pub fn hubs(&self) -> &Arc<HubRegistry> {
        &self.hubs
    }

    pub async fn create_match(&self, options: GameOptions) -> Result<GameId, MatchError> {
        options.verify()?;
        let game_id = self.ids.allocate(Namespace::Games).await?;
        let player_ids = self
            .ids
            .allocate_many(Namespace::Players, options.player_count as usize)
            .await?;

        let game = Game::new(game_id, options, player_ids, Utc::now());
        self.store.insert_game(&game_record(&game)?).await?;
        let players: Vec<_> = game.players.iter().map(player_record).collect();
        self.store.insert_players(&players).await?;

        log::info!("created game {game_id}: {options}");
        Ok(game_id)
    }

    pub async fn get_match(&self, game_id: GameId) -> Result<Game, MatchError> {
        let record = self
            .store
            .get_game(game_id)
            .await?
            .ok_or(MatchError::GameNotFound(game_id))?;
        let players = self.store.get_game_players(game_id).await?;
        let moves = self.store.get_game_moves(game_id).await?;
        game_from_records(record, players, moves)
    }

    pub async fn player_map(&self, game_id: GameId) -> Result<BTreeMap<String, PlayerId>, MatchError> {
        Ok(self.get_match(game_id).await?.player_map())
    }

    pub async fn current_moves(&self, game_id: GameId) -> Result<Vec<Move>, MatchError> {
        let record = self
            .store
            .get_game(game_id)
            .await?
            .ok_or(MatchError::GameNotFound(game_id))?;
        self.store
            .get_turn_moves(game_id, record.turn_count)
            .await?
            .into_iter()
            .map(move_from_record)
            .collect()
    }

    pub async fn register_player(
        &self,
        game_id: GameId,
        name: &str,
    ) -> Result<Registration, MatchError> {
        let mut game = self.get_match(game_id).await?;
        let before = game.clone();
        let registration = {
            let mut rng = self.rng.lock().await;
            game.register_player(name, &mut *rng, Utc::now())?
        };
        self.persist(&before, &game).await?;

        self.send(
            game_id,
            "Player",
            json!({ "player_id": registration.player_id, "name": name }),
        );
        if let Some(report) = &registration.stage {
            self.announce(game_id, report);
        }
        Ok(registration)
    }

    /// Registers each name in order and returns the resulting name to id map.
    /// Stops at the first failure; earlier registrations stay.
    pub async fn register_players(
        &self,
        game_id: GameId,
        names: &[String],
    ) -> Result<BTreeMap<String, PlayerId>, MatchError> {
        for name in names {
            self.register_player(game_id, name).await?;
        }
        self.player_map(game_id).await
    }

    /// `target_id` 0 abstains; `move_type` 0 is a lynch vote, otherwise a
    /// role code.
    pub async fn submit_move(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        target_id: PlayerId,
        move_type: u8,
    ) -> Result<MoveOutcome, MatchError> {
        let kind = MoveKind::from_code(move_type).ok_or(MatchError::UnknownMoveType(move_type))?;
        let target = (target_id != 0).then_some(target_id);

        let mut game = self.get_match(game_id).await?;
        let before = game.clone();
        let outcome = game.submit_move(player_id, target, kind, Utc::now())?;
        self.persist(&before, &game).await?;

        self.send(game_id, "Move", player_id);
        if let Some(report) = &outcome.stage {
            self.announce(game_id, report);
        }
        Ok(outcome)
    }

    /// Forces the current stage to resolve, e.g. when its deadline passed.
    pub async fn progress_stage(&self, game_id: GameId) -> Result<StageReport, MatchError> {
        let mut game = self.get_match(game_id).await?;
        let before = game.clone();
        let report = game.progress_stage(Utc::now())?;
        if report.changed() {
            self.persist(&before, &game).await?;
            self.announce(game_id, &report);
        }
        Ok(report)
    }

    pub async fn subscribe(&self, game_id: GameId) -> Result<Subscription, MatchError> {
        let record = self
            .store
            .get_game(game_id)
            .await?
            .ok_or(MatchError::GameNotFound(game_id))?;
        let subscription = self.hubs.subscribe(game_id)?;
        if types::Stage::from_code(record.stage).is_some_and(types::Stage::is_terminal) {
            self.hubs.retire(game_id);
        }
        Ok(subscription)
    }

    pub async fn unsubscribe(&self, game_id: GameId, id: SubscriberId) -> Result<usize, MatchError> {
        Ok(self.hubs.unsubscribe(game_id, id).await?)
    }

    /// Writes every row that differs between the two snapshots in one go.
    async fn persist(&self, before: &Game, after: &Game) -> Result<(), MatchError> {
        let players = before
            .players
            .iter()
            .zip(after.players.iter())
            .filter(|(old, new)| old != new)
            .map(|(_, new)| player_record(new))
            .collect();

        let previous: HashMap<_, _> = before.moves.iter().map(|m| (m.sort_key(), m)).collect();
        let mut new_moves = Vec::new();
        let mut changed_moves = Vec::new();
        for mv in after.moves.iter() {
            match previous.get(&mv.sort_key()) {
                None => new_moves.push(move_record(mv)),
                Some(&old) if old != mv => changed_moves.push(move_record(mv)),
                Some(_) => {}
            }
        }

        self.store
            .save_changes(&GameChanges {
                game: game_record(after)?,
                players,
                new_moves,
                changed_moves,
            })
            .await?;
        Ok(())
    }

    fn announce(&self, game_id: GameId, report: &StageReport) {
        match report.winner {
            Some(_) => self.send(game_id, "Victory", report.to.code()),
            None => self.send(game_id, "Turn", report.turn_count),
        }
        if report.to.is_terminal() {
            self.hubs.retire(game_id);
        }
    }

    /// Observers are optional, so a missing hub is not an error here.
    fn send<T: serde::Serialize>(&self, game_id: GameId, event: &str, data: T) {
        match self.hubs.broadcast_event(game_id, event, data) {
            Ok(()) => {}
            Err(HubError::HubNotFound(_)) => {
                log::debug!("no observers for game {game_id}, dropped {event}")
            }
            Err(err) => log::warn!("could not broadcast {event} for game {game_id}: {err}"),
        }
    }
}
