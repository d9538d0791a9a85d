use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Size of each id namespace. Ids are 16-bit and `0` is never handed out.
pub const ID_SPACE: u32 = 1 << 16;

/// Id namespaces with their own counter and entity table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Games,
    Players,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Games => "games",
            Namespace::Players => "players",
        }
    }

    pub(crate) fn id_column(self) -> &'static str {
        match self {
            Namespace::Games => "game_id",
            Namespace::Players => "player_id",
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounter {
    pub namespace: Namespace,
    pub count: u32,
    pub scale: u32,
    pub add_const: u32,
}

impl IdCounter {
    /// Seed values matching the ones the migrations insert.
    pub fn seed(namespace: Namespace) -> Self {
        let (scale, add_const) = match namespace {
            Namespace::Games => (40503, 1),
            Namespace::Players => (48271, 11),
        };
        Self {
            namespace,
            count: 0,
            scale,
            add_const,
        }
    }

    pub fn candidate(&self, count: u32) -> u32 {
        let raw = u64::from(count) * u64::from(self.scale) + u64::from(self.add_const);
        (raw % u64::from(ID_SPACE)) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: u32,
    pub stage: i64,
    pub started: chrono::DateTime<chrono::Utc>,
    pub modified: chrono::DateTime<chrono::Utc>,
    pub stage_finish: Option<chrono::DateTime<chrono::Utc>>,
    pub turn_count: u32,
    pub options: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub game_id: u32,
    pub player_id: u32,
    pub name: String,
    /// `0` until a role is dealt.
    pub role: u8,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub game_id: u32,
    pub turn_count: u32,
    pub player_id: u32,
    /// `0` means no target.
    pub target_id: u32,
    pub move_type: u8,
    pub time: chrono::DateTime<chrono::Utc>,
}

/// Every row one operation changed in a match. Stores apply it all or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameChanges {
    pub game: GameRecord,
    pub players: Vec<PlayerRecord>,
    pub new_moves: Vec<MoveRecord>,
    pub changed_moves: Vec<MoveRecord>,
}
