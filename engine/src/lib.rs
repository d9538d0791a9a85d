pub mod config;
pub mod error;
pub mod records;
pub mod service;

use types::{Game, GameId, MoveKind, Player, PlayerId, Stage, Strategy};

pub use config::{MatchConfig, PlayerConfig, StrategyKind};
pub use error::{ErrorKind, MatchError};
pub use service::MatchService;

#[derive(Debug)]
pub struct Seat {
    pub player_id: PlayerId,
    pub strategy: Box<dyn Strategy>,
}

fn move_kind(stage: Stage, player: &Player) -> Option<MoveKind> {
    match stage {
        Stage::Night => player.role.map(MoveKind::Night),
        Stage::Day => Some(MoveKind::Lynch),
        _ => None,
    }
}

/// Plays a registered match to the end, asking each living seat for a move
/// every turn. Stops early once `max_turns` turns have been played.
pub async fn run_match(
    service: &MatchService,
    game_id: GameId,
    seats: &mut [Seat],
    max_turns: u32,
) -> Result<Game, MatchError> {
    loop {
        let game = service.get_match(game_id).await?;
        log::debug!("{game}");
        if game.stage.is_terminal() || game.turn_count > max_turns {
            return Ok(game);
        }
        if game.stage == Stage::Pregame {
            service.progress_stage(game_id).await?;
            continue;
        }

        let public_info = game.public_info();
        let mut moved = false;
        for seat in seats.iter_mut() {
            let player = game.player(seat.player_id)?;
            if !player.alive || game.current_moves().any(|m| m.player_id == seat.player_id) {
                continue;
            }
            let Some(kind) = move_kind(game.stage, player) else {
                continue;
            };

            let target = seat.strategy.select_target(player, &public_info);
            let outcome = match service
                .submit_move(game_id, seat.player_id, target.unwrap_or(0), kind.code())
                .await
            {
                Err(err) if err.kind() == ErrorKind::Validation && target.is_some() => {
                    log::warn!("#{} move rejected ({err}), abstaining", seat.player_id);
                    service
                        .submit_move(game_id, seat.player_id, 0, kind.code())
                        .await?
                }
                result => result?,
            };
            moved = true;

            if let (Some(target), Some(is_mafia)) = (target, outcome.investigation) {
                seat.strategy.observe_investigation(target, is_mafia);
            }
            if outcome.stage.is_some() {
                break;
            }
        }

        // nobody seated could move, so resolve the stage as if its deadline passed
        if !moved {
            service.progress_stage(game_id).await?;
        }
    }
}
