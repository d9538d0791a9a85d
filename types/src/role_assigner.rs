use itertools::Itertools;
use rand::Rng;

use crate::{GameOptions, Player, Role, RuleError};

fn quota(options: &GameOptions, role: Role) -> u32 {
    match role {
        Role::Villager => options.villager_count(),
        Role::Mafia => options.mafia_count,
        Role::Doctor => options.doctor_count,
        Role::Sheriff => options.sheriff_count,
    }
}

/// Roles still to be dealt, in walk order.
pub fn remaining_roles(options: &GameOptions, players: &[Player]) -> [(Role, u32); 4] {
    let dealt = players.iter().filter_map(|p| p.role).counts();
    Role::ALL.map(|role| {
        let used = dealt.get(&role).copied().unwrap_or(0) as u32;
        (role, quota(options, role).saturating_sub(used))
    })
}

/// Draws a role for the next player so that, over a full roster, every
/// quota is met exactly. Each remaining role slot is equally likely.
pub fn assign_role<R: Rng + ?Sized>(
    game_id: crate::GameId,
    options: &GameOptions,
    players: &[Player],
    rng: &mut R,
) -> Result<Role, RuleError> {
    let remaining = remaining_roles(options, players);
    let total: u32 = remaining.iter().map(|(_, left)| left).sum();
    if total == 0 {
        return Err(RuleError::NoRolesRemaining(game_id));
    }

    let mut draw = rng.gen_range(0..total);
    for (role, left) in remaining {
        if draw < left {
            return Ok(role);
        }
        draw -= left;
    }
    Err(RuleError::NoRolesRemaining(game_id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn options() -> GameOptions {
        GameOptions {
            player_count: 8,
            mafia_count: 2,
            doctor_count: 1,
            sheriff_count: 1,
            day_interval_units: 4,
            night_interval_units: 2,
        }
    }

    fn deal_all(seed: u64) -> Vec<Player> {
        let options = options();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut players: Vec<Player> = Vec::new();
        for id in 1..=options.player_count {
            let role = assign_role(7, &options, &players, &mut rng).unwrap();
            let mut player = Player::new_slot(7, id);
            player.name = format!("p{id}");
            player.role = Some(role);
            players.push(player);
        }
        players
    }

    #[test]
    fn test_full_roster_matches_quotas() {
        for seed in 0..20 {
            let players = deal_all(seed);
            let counts: HashMap<Role, usize> = players.iter().filter_map(|p| p.role).counts();
            assert_eq!(counts.get(&Role::Villager), Some(&4));
            assert_eq!(counts.get(&Role::Mafia), Some(&2));
            assert_eq!(counts.get(&Role::Doctor), Some(&1));
            assert_eq!(counts.get(&Role::Sheriff), Some(&1));
        }
    }

    #[test]
    fn test_no_roles_remaining() {
        let players = deal_all(3);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            assign_role(7, &options(), &players, &mut rng),
            Err(RuleError::NoRolesRemaining(7))
        );
    }

    #[test]
    fn test_only_remaining_role_is_dealt() {
        let options = GameOptions {
            player_count: 3,
            mafia_count: 1,
            ..Default::default()
        };
        let mut players: Vec<Player> = (1..=2)
            .map(|id| {
                let mut p = Player::new_slot(1, id);
                p.name = format!("p{id}");
                p.role = Some(Role::Villager);
                p
            })
            .collect();
        players.push(Player::new_slot(1, 3));
        let mut rng = StdRng::seed_from_u64(99);
        assert_eq!(
            assign_role(1, &options, &players, &mut rng),
            Ok(Role::Mafia)
        );
    }
}
