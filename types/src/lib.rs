pub mod error;
pub mod game_move;
pub mod game_state;
pub mod options;
pub mod player;
pub mod role;
pub mod role_assigner;
pub mod stage;
pub mod tally;

pub use error::RuleError;
pub use game_move::Move;
pub use game_state::{Game, MoveOutcome, PublicInfo, Registration, StageReport};
pub use options::{GameOptions, OptionsError, INTERVAL_UNIT_SECS};
pub use player::{GameId, Player, PlayerId, Strategy};
pub use role::{MoveKind, Role};
pub use role_assigner::assign_role;
pub use stage::{Stage, Winner};
pub use tally::{Resolution, VoteTally};
