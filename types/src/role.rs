use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Mafia,
    Doctor,
    Sheriff,
}

impl Role {
    /// Fixed walk order used when dealing roles.
    pub const ALL: [Role; 4] = [Role::Villager, Role::Mafia, Role::Doctor, Role::Sheriff];

    pub fn code(self) -> u8 {
        match self {
            Role::Villager => 1,
            Role::Mafia => 2,
            Role::Doctor => 3,
            Role::Sheriff => 4,
        }
    }

    /// `0` is the unassigned marker and maps to `None`, as does any unknown code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Role::Villager),
            2 => Some(Role::Mafia),
            3 => Some(Role::Doctor),
            4 => Some(Role::Sheriff),
            _ => None,
        }
    }

    pub fn is_mafia(self) -> bool {
        self == Role::Mafia
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Villager => write!(f, "Villager"),
            Role::Mafia => write!(f, "Mafia"),
            Role::Doctor => write!(f, "Doctor"),
            Role::Sheriff => write!(f, "Sheriff"),
        }
    }
}

/// What a move is for: a day lynch vote, or the night action of a role.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    Lynch,
    Night(Role),
}

impl MoveKind {
    pub fn code(self) -> u8 {
        match self {
            MoveKind::Lynch => 0,
            MoveKind::Night(role) => role.code(),
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MoveKind::Lynch),
            other => Role::from_code(other).map(MoveKind::Night),
        }
    }
}

impl Display for MoveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveKind::Lynch => write!(f, "lynch vote"),
            MoveKind::Night(Role::Villager) => write!(f, "villager pass"),
            MoveKind::Night(Role::Mafia) => write!(f, "mafia kill"),
            MoveKind::Night(Role::Doctor) => write!(f, "doctor save"),
            MoveKind::Night(Role::Sheriff) => write!(f, "sheriff investigation"),
        }
    }
}
