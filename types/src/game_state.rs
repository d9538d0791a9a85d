use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Duration, Utc};
use log;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    role_assigner::assign_role, GameId, GameOptions, Move, MoveKind, Player, PlayerId,
    Resolution, Role, RuleError, Stage, VoteTally, Winner,
};

/// Aggregate root for one match. All rule checks and transitions live here;
/// loading and persisting it is someone else's job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: GameId,
    pub stage: Stage,
    pub started: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub stage_finish: Option<DateTime<Utc>>,
    pub turn_count: u32,
    pub players: Vec<Player>,
    pub moves: Vec<Move>,
    pub options: GameOptions,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicInfo {
    pub game_id: GameId,
    pub stage: Stage,
    pub turn_count: u32,
    pub living: Vec<PlayerId>,
    pub dead: Vec<PlayerId>,
    /// Lynch votes cast so far this turn. Night actions stay hidden.
    pub day_votes: Vec<Move>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub from: Stage,
    pub to: Stage,
    pub turn_count: u32,
    pub resolution: Option<Resolution>,
    pub eliminated: Option<PlayerId>,
    pub winner: Option<Winner>,
}

impl StageReport {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

impl Display for StageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} (turn {})", self.from, self.to, self.turn_count)?;
        if let Some(resolution) = self.resolution {
            write!(f, ": {resolution}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub player_id: PlayerId,
    pub role: Role,
    pub stage: Option<StageReport>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub recorded: Move,
    /// False when an earlier move this turn was overwritten.
    pub created: bool,
    /// Answer to a sheriff investigation: whether the target is mafia.
    pub investigation: Option<bool>,
    pub stage: Option<StageReport>,
}

impl MoveOutcome {
    pub fn eliminated(&self) -> Option<PlayerId> {
        self.stage.as_ref().and_then(|report| report.eliminated)
    }
}

impl Game {
    pub fn new(
        game_id: GameId,
        options: GameOptions,
        player_ids: impl IntoIterator<Item = PlayerId>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut players: Vec<Player> = player_ids
            .into_iter()
            .map(|player_id| Player::new_slot(game_id, player_id))
            .collect();
        players.sort_by_key(|p| p.player_id);
        Self {
            game_id,
            stage: Stage::Pregame,
            started: now,
            modified: now,
            stage_finish: None,
            turn_count: 0,
            players,
            moves: Vec::new(),
            options,
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Result<&Player, RuleError> {
        self.players
            .iter()
            .find(|p| p.player_id == player_id)
            .ok_or(RuleError::UnknownPlayer {
                game_id: self.game_id,
                player_id,
            })
    }

    fn player_index(&self, player_id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.player_id == player_id)
    }

    pub fn player_map(&self) -> BTreeMap<String, PlayerId> {
        self.players
            .iter()
            .filter(|p| p.is_registered())
            .map(|p| (p.name.clone(), p.player_id))
            .collect()
    }

    pub fn living_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn current_moves(&self) -> impl Iterator<Item = &Move> {
        self.moves
            .iter()
            .filter(move |m| m.turn_count == self.turn_count)
    }

    pub fn public_info(&self) -> PublicInfo {
        let (living, dead) = self.players.iter().fold(
            (Vec::new(), Vec::new()),
            |(mut living, mut dead), p| {
                if p.alive {
                    living.push(p.player_id);
                } else {
                    dead.push(p.player_id);
                }
                (living, dead)
            },
        );
        let day_votes = match self.stage {
            Stage::Day => self
                .current_moves()
                .filter(|m| m.kind == MoveKind::Lynch)
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
        PublicInfo {
            game_id: self.game_id,
            stage: self.stage,
            turn_count: self.turn_count,
            living,
            dead,
            day_votes,
        }
    }

    /// Names the first open slot and deals it a role. Naming the last slot
    /// starts the match.
    pub fn register_player<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Registration, RuleError> {
        if name.is_empty() {
            return Err(RuleError::EmptyName);
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(RuleError::DuplicateName(name.to_string()));
        }
        let slot = self
            .players
            .iter()
            .position(|p| !p.is_registered())
            .ok_or(RuleError::RosterFull(self.game_id))?;

        let role = assign_role(self.game_id, &self.options, &self.players, rng)?;
        let player = &mut self.players[slot];
        player.name = name.to_string();
        player.role = Some(role);
        let player_id = player.player_id;
        log::debug!("{} registered as #{player_id}", name);

        let stage = if self.stage == Stage::Pregame && self.players.iter().all(Player::is_registered)
        {
            Some(self.progress_stage(now)?)
        } else {
            None
        };
        self.modified = now;

        Ok(Registration {
            player_id,
            role,
            stage,
        })
    }

    fn check_kind(&self, player: &Player, kind: MoveKind) -> Result<(), RuleError> {
        match (self.stage, kind) {
            (Stage::Night, MoveKind::Night(role)) if player.role == Some(role) => Ok(()),
            (Stage::Night, _) => Err(RuleError::InvalidMove(format!(
                "{kind} does not match the role of #{}",
                player.player_id
            ))),
            (Stage::Day, MoveKind::Lynch) => Ok(()),
            (Stage::Day, _) => Err(RuleError::InvalidMove(format!(
                "{kind} is not a lynch vote"
            ))),
            (stage, _) => Err(RuleError::StageClosed {
                game_id: self.game_id,
                stage,
            }),
        }
    }

    pub fn submit_move(
        &mut self,
        player_id: PlayerId,
        target_id: Option<PlayerId>,
        kind: MoveKind,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, RuleError> {
        let player = self.player(player_id)?;
        if !player.alive {
            return Err(RuleError::InvalidMove(format!(
                "#{player_id} is dead and cannot move"
            )));
        }
        let target = match target_id {
            Some(target_id) => Some(self.players.iter().find(|p| p.player_id == target_id).ok_or(
                RuleError::UnknownTarget {
                    game_id: self.game_id,
                    target_id,
                },
            )?),
            None => None,
        };
        self.check_kind(player, kind)?;

        let investigation = match (kind, target) {
            (MoveKind::Night(Role::Sheriff), Some(target)) => Some(target.is_mafia()),
            _ => None,
        };
        let is_sheriff = player.role == Some(Role::Sheriff);

        let turn_count = self.turn_count;
        let existing = self
            .moves
            .iter()
            .position(|m| m.turn_count == turn_count && m.player_id == player_id);
        let (recorded, created) = match existing {
            Some(_) if is_sheriff => return Err(RuleError::CannotChangeMove(player_id)),
            Some(index) => {
                let previous = &mut self.moves[index];
                previous.target_id = target_id;
                previous.kind = kind;
                previous.time = now;
                (previous.clone(), false)
            }
            None => {
                let recorded = Move {
                    game_id: self.game_id,
                    turn_count,
                    player_id,
                    target_id,
                    kind,
                    time: now,
                };
                let index = self
                    .moves
                    .partition_point(|m| m.sort_key() < recorded.sort_key());
                self.moves.insert(index, recorded.clone());
                (recorded, true)
            }
        };
        log::debug!("game {}: {recorded}", self.game_id);

        let stage = if self.all_moved() {
            Some(self.progress_stage(now)?)
        } else {
            None
        };
        self.modified = now;

        Ok(MoveOutcome {
            recorded,
            created,
            investigation,
            stage,
        })
    }

    pub fn all_moved(&self) -> bool {
        self.living_players().all(|p| {
            self.current_moves()
                .any(|m| m.player_id == p.player_id)
        })
    }

    fn tally_night(&self) -> Resolution {
        let votes_for = |role: Role| {
            VoteTally::count(
                self.current_moves()
                    .filter(|m| m.kind == MoveKind::Night(role))
                    .filter(|m| {
                        self.players
                            .iter()
                            .any(|p| p.player_id == m.player_id && p.role == Some(role))
                    })
                    .map(|m| m.target_id),
            )
        };
        Resolution::night(votes_for(Role::Mafia), votes_for(Role::Doctor))
    }

    fn tally_day(&self) -> Resolution {
        Resolution::day(VoteTally::count(
            self.current_moves()
                .filter(|m| m.kind == MoveKind::Lynch)
                .map(|m| m.target_id),
        ))
    }

    fn eliminate(&mut self, resolution: Resolution) -> Option<PlayerId> {
        let target = resolution.eliminated()?;
        let index = self.player_index(target)?;
        let player = &mut self.players[index];
        if !player.alive {
            return None;
        }
        player.alive = false;
        Some(target)
    }

    /// Living roster check. An empty living roster counts as a town win.
    pub fn winner(&self) -> Option<Winner> {
        let (mafia, town): (Vec<&Player>, Vec<&Player>) =
            self.living_players().partition(|p| p.is_mafia());
        if mafia.is_empty() {
            Some(Winner::Town)
        } else if town.is_empty() {
            Some(Winner::Mafia)
        } else {
            None
        }
    }

    /// Resolves the current stage and moves to the next one. Does nothing once
    /// the match is over.
    pub fn progress_stage(&mut self, now: DateTime<Utc>) -> Result<StageReport, RuleError> {
        let from = self.stage;
        let (to, resolution, interval) = match from {
            Stage::Pregame => {
                let unnamed = self.players.iter().filter(|p| !p.is_registered()).count();
                if unnamed > 0 {
                    return Err(RuleError::RosterIncomplete {
                        game_id: self.game_id,
                        unnamed,
                    });
                }
                (Stage::Night, None, self.options.night_interval_secs())
            }
            Stage::Night => (
                Stage::Day,
                Some(self.tally_night()),
                self.options.day_interval_secs(),
            ),
            Stage::Day => (
                Stage::Night,
                Some(self.tally_day()),
                self.options.night_interval_secs(),
            ),
            Stage::TownWin | Stage::MafiaWin => {
                return Ok(StageReport {
                    from,
                    to: from,
                    turn_count: self.turn_count,
                    resolution: None,
                    eliminated: None,
                    winner: None,
                })
            }
        };

        let eliminated = resolution.and_then(|resolution| self.eliminate(resolution));
        // a kill aimed at someone already dead changes nothing
        let resolution = resolution.map(|resolution| match (resolution, eliminated) {
            (Resolution::Kill(_), None) => Resolution::NoKill,
            (resolution, _) => resolution,
        });
        self.stage = to;
        self.stage_finish = Some(now + Duration::seconds(interval));
        self.turn_count += 1;

        let winner = self.winner();
        if let Some(winner) = winner {
            self.stage = winner.stage();
            self.stage_finish = None;
        }
        self.modified = now;

        let report = StageReport {
            from,
            to: self.stage,
            turn_count: self.turn_count,
            resolution,
            eliminated,
            winner,
        };
        log::info!("game {}: {report}", self.game_id);
        Ok(report)
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Game {} [{}] turn {}",
            self.game_id, self.stage, self.turn_count
        )?;
        for player in &self.players {
            let role = player
                .role
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            let status = if player.alive { "alive" } else { "dead" };
            writeln!(f, "  {player}: {role}, {status}")?;
        }
        Ok(())
    }
}
