//! Conversions between the domain aggregate and stored rows. Anything that
//! does not decode cleanly is reported as a corrupt record.

use database::{GameRecord, MoveRecord, PlayerRecord};
use types::{Game, GameOptions, Move, MoveKind, Player, Role, Stage};

use crate::MatchError;

pub fn game_record(game: &Game) -> Result<GameRecord, MatchError> {
    Ok(GameRecord {
        game_id: game.game_id,
        stage: game.stage.code().into(),
        started: game.started,
        modified: game.modified,
        stage_finish: game.stage_finish,
        turn_count: game.turn_count,
        options: game.options.encode()?,
    })
}

pub fn player_record(player: &Player) -> PlayerRecord {
    PlayerRecord {
        game_id: player.game_id,
        player_id: player.player_id,
        name: player.name.clone(),
        role: player.role.map(Role::code).unwrap_or(0),
        alive: player.alive,
    }
}

pub fn move_record(mv: &Move) -> MoveRecord {
    MoveRecord {
        game_id: mv.game_id,
        turn_count: mv.turn_count,
        player_id: mv.player_id,
        target_id: mv.target_id.unwrap_or(0),
        move_type: mv.kind.code(),
        time: mv.time,
    }
}

pub fn player_from_record(record: PlayerRecord) -> Result<Player, MatchError> {
    let role = match record.role {
        0 => None,
        code => Some(Role::from_code(code).ok_or_else(|| {
            MatchError::CorruptRecord(format!(
                "player {} has unknown role {code}",
                record.player_id
            ))
        })?),
    };
    Ok(Player {
        game_id: record.game_id,
        player_id: record.player_id,
        name: record.name,
        role,
        alive: record.alive,
    })
}

pub fn move_from_record(record: MoveRecord) -> Result<Move, MatchError> {
    let kind = MoveKind::from_code(record.move_type).ok_or_else(|| {
        MatchError::CorruptRecord(format!(
            "move by player {} in turn {} has unknown type {}",
            record.player_id, record.turn_count, record.move_type
        ))
    })?;
    Ok(Move {
        game_id: record.game_id,
        turn_count: record.turn_count,
        player_id: record.player_id,
        target_id: (record.target_id != 0).then_some(record.target_id),
        kind,
        time: record.time,
    })
}

pub fn game_from_records(
    record: GameRecord,
    players: Vec<PlayerRecord>,
    moves: Vec<MoveRecord>,
) -> Result<Game, MatchError> {
    let stage = Stage::from_code(record.stage).ok_or_else(|| {
        MatchError::CorruptRecord(format!(
            "game {} has unknown stage {}",
            record.game_id, record.stage
        ))
    })?;
    let options = GameOptions::decode(record.options).map_err(|e| {
        MatchError::CorruptRecord(format!("game {} options: {e}", record.game_id))
    })?;

    let mut players = players
        .into_iter()
        .map(player_from_record)
        .collect::<Result<Vec<_>, _>>()?;
    players.sort_by_key(|p| p.player_id);
    let mut moves = moves
        .into_iter()
        .map(move_from_record)
        .collect::<Result<Vec<_>, _>>()?;
    moves.sort_by_key(Move::sort_key);

    Ok(Game {
        game_id: record.game_id,
        stage,
        started: record.started,
        modified: record.modified,
        stage_finish: record.stage_finish,
        turn_count: record.turn_count,
        players,
        moves,
        options,
    })
}
