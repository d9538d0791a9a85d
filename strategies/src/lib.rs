pub mod input_strategy;

use std::collections::BTreeSet;

use itertools::Itertools;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use types::{game_state::PublicInfo, Player, PlayerId, Role, Stage, Strategy};

pub use crate::input_strategy::InputStrategy;

/// Who `me` may reasonably target right now. Villagers have nothing to do at
/// night, and only doctors may pick themselves.
fn candidates(me: &Player, public_info: &PublicInfo) -> Vec<PlayerId> {
    let include_self = public_info.stage == Stage::Night && me.role == Some(Role::Doctor);
    public_info
        .living
        .iter()
        .copied()
        .filter(|&id| include_self || id != me.player_id)
        .collect()
}

fn acts_tonight(me: &Player, public_info: &PublicInfo) -> bool {
    public_info.stage != Stage::Night || me.role != Some(Role::Villager)
}

#[derive(Debug)]
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Strategy for RandomStrategy {
    fn select_target(&mut self, me: &Player, public_info: &PublicInfo) -> Option<PlayerId> {
        if !acts_tonight(me, public_info) {
            return None;
        }
        candidates(me, public_info).choose(&mut self.rng).copied()
    }
}

/// Predictable play: lowest ids first, pile onto the leading day vote, and
/// vote out anyone the sheriff has caught.
#[derive(Debug, Default)]
pub struct DefaultStrategy {
    investigated: BTreeSet<PlayerId>,
    known_mafia: BTreeSet<PlayerId>,
}

impl Strategy for DefaultStrategy {
    fn select_target(&mut self, me: &Player, public_info: &PublicInfo) -> Option<PlayerId> {
        if !acts_tonight(me, public_info) {
            return None;
        }
        let candidates = candidates(me, public_info);

        match (public_info.stage, me.role) {
            (Stage::Night, Some(Role::Sheriff)) => candidates
                .iter()
                .copied()
                .find(|id| !self.investigated.contains(id))
                .or_else(|| candidates.first().copied()),
            (Stage::Day, _) => {
                if let Some(&caught) = candidates.iter().find(|&&id| self.known_mafia.contains(&id)) {
                    return Some(caught);
                }
                let leading = public_info
                    .day_votes
                    .iter()
                    .filter_map(|m| m.target_id)
                    .filter(|target| candidates.contains(target))
                    .counts()
                    .into_iter()
                    .max_by_key(|&(target, votes)| (votes, std::cmp::Reverse(target)))
                    .map(|(target, _)| target);
                leading.or_else(|| candidates.first().copied())
            }
            _ => candidates.first().copied(),
        }
    }

    fn observe_investigation(&mut self, target: PlayerId, is_mafia: bool) {
        log::debug!("investigated #{target}: mafia = {is_mafia}");
        self.investigated.insert(target);
        if is_mafia {
            self.known_mafia.insert(target);
        }
    }
}
