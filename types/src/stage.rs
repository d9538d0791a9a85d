use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Pregame,
    Night,
    Day,
    TownWin,
    MafiaWin,
}

impl Stage {
    pub fn code(self) -> i8 {
        match self {
            Stage::Pregame => -1,
            Stage::Night => 1,
            Stage::Day => 2,
            Stage::TownWin => 11,
            Stage::MafiaWin => 12,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Stage::Pregame),
            1 => Some(Stage::Night),
            2 => Some(Stage::Day),
            11 => Some(Stage::TownWin),
            12 => Some(Stage::MafiaWin),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::TownWin | Stage::MafiaWin)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Pregame => write!(f, "Pregame"),
            Stage::Night => write!(f, "Night"),
            Stage::Day => write!(f, "Day"),
            Stage::TownWin => write!(f, "Town wins"),
            Stage::MafiaWin => write!(f, "Mafia wins"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Town,
    Mafia,
}

impl Winner {
    pub fn stage(self) -> Stage {
        match self {
            Winner::Town => Stage::TownWin,
            Winner::Mafia => Stage::MafiaWin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_codes() {
        for stage in [
            Stage::Pregame,
            Stage::Night,
            Stage::Day,
            Stage::TownWin,
            Stage::MafiaWin,
        ] {
            assert_eq!(Stage::from_code(stage.code().into()), Some(stage));
        }
        assert_eq!(Stage::from_code(0), None);
        assert_eq!(Stage::from_code(3), None);
    }
}
