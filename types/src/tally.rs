use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// Outcome of counting one kind of vote. A target of `None` is an abstention,
/// which can win like any other target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoteTally {
    Majority(Option<PlayerId>),
    NoMajority,
    NoVotes,
}

impl VoteTally {
    /// Picks the target with the strictly highest count. Any tie at the top
    /// count means no majority, whatever order the votes arrive in.
    pub fn count<I>(votes: I) -> Self
    where
        I: IntoIterator<Item = Option<PlayerId>>,
    {
        let counts = votes.into_iter().counts();
        let Some(top) = counts.values().copied().max() else {
            return VoteTally::NoVotes;
        };

        let mut leaders = counts
            .into_iter()
            .filter(|&(_, count)| count == top)
            .map(|(target, _)| target);
        match (leaders.next(), leaders.next()) {
            (Some(target), None) => VoteTally::Majority(target),
            _ => VoteTally::NoMajority,
        }
    }

    pub fn target(self) -> Option<PlayerId> {
        match self {
            VoteTally::Majority(target) => target,
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Kill(PlayerId),
    Save(PlayerId),
    NoKill,
    NoMajority,
}

impl Resolution {
    pub fn code(self) -> &'static str {
        match self {
            Resolution::Kill(_) => "kill",
            Resolution::Save(_) => "save",
            Resolution::NoKill => "no-kill",
            Resolution::NoMajority => "no-majority",
        }
    }

    pub fn eliminated(self) -> Option<PlayerId> {
        match self {
            Resolution::Kill(target) => Some(target),
            _ => None,
        }
    }

    /// Mafia kill unless the doctors landed on the same target.
    pub fn night(mafia: VoteTally, doctor: VoteTally) -> Self {
        match mafia {
            VoteTally::Majority(Some(target)) if doctor.target() == Some(target) => {
                Resolution::Save(target)
            }
            VoteTally::Majority(Some(target)) => Resolution::Kill(target),
            VoteTally::Majority(None) | VoteTally::NoVotes => Resolution::NoKill,
            VoteTally::NoMajority => Resolution::NoMajority,
        }
    }

    pub fn day(lynch: VoteTally) -> Self {
        match lynch {
            VoteTally::Majority(Some(target)) => Resolution::Kill(target),
            VoteTally::Majority(None) | VoteTally::NoVotes => Resolution::NoKill,
            VoteTally::NoMajority => Resolution::NoMajority,
        }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Kill(target) => write!(f, "#{target} was killed"),
            Resolution::Save(target) => write!(f, "#{target} was saved"),
            Resolution::NoKill => write!(f, "nobody was killed"),
            Resolution::NoMajority => write!(f, "no majority was reached"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_at_top_has_no_majority() {
        assert_eq!(
            VoteTally::count([Some(1), Some(1), Some(1), Some(2), Some(2), Some(2)]),
            VoteTally::NoMajority
        );
        assert_eq!(
            VoteTally::count([Some(3), Some(2)]),
            VoteTally::NoMajority
        );
        assert_eq!(
            VoteTally::count([Some(3), Some(2), Some(3), Some(2), Some(7)]),
            VoteTally::NoMajority
        );
    }

    #[test]
    fn test_three_against_two() {
        assert_eq!(
            VoteTally::count([Some(1), Some(2), Some(1), Some(2), Some(1)]),
            VoteTally::Majority(Some(1))
        );
    }

    #[test]
    fn test_single_target() {
        assert_eq!(
            VoteTally::count([Some(3), Some(3)]),
            VoteTally::Majority(Some(3))
        );
    }

    #[test]
    fn test_unique_leader_wins() {
        assert_eq!(
            VoteTally::count([Some(3), Some(3), Some(2)]),
            VoteTally::Majority(Some(3))
        );
        assert_eq!(
            VoteTally::count([Some(2), Some(3), Some(3)]),
            VoteTally::Majority(Some(3))
        );
    }

    #[test]
    fn test_abstain_can_win() {
        let tally = VoteTally::count([None, None, Some(4)]);
        assert_eq!(tally, VoteTally::Majority(None));
        assert_eq!(tally.target(), None);
        assert_eq!(Resolution::day(tally), Resolution::NoKill);
    }

    #[test]
    fn test_no_votes() {
        assert_eq!(VoteTally::count(Vec::new()), VoteTally::NoVotes);
    }

    #[test]
    fn test_night_save_and_kill() {
        let mafia = VoteTally::count([Some(5), Some(5)]);
        let doctor = VoteTally::count([Some(5)]);
        assert_eq!(Resolution::night(mafia, doctor), Resolution::Save(5));
        assert_eq!(Resolution::night(mafia, doctor).code(), "save");

        let doctor = VoteTally::count([Some(6)]);
        assert_eq!(Resolution::night(mafia, doctor), Resolution::Kill(5));
        assert_eq!(Resolution::night(mafia, VoteTally::NoVotes), Resolution::Kill(5));
    }

    #[test]
    fn test_day_resolution_codes() {
        assert_eq!(Resolution::day(VoteTally::count([Some(1), Some(1)])).code(), "kill");
        assert_eq!(
            Resolution::day(VoteTally::count([Some(1), Some(2)])).code(),
            "no-majority"
        );
        assert_eq!(Resolution::day(VoteTally::count([None])).code(), "no-kill");
    }
}
