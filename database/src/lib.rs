pub mod config;
pub mod error;
pub mod id_allocator;
pub mod models;
pub mod retry;
pub mod stores;

pub use config::DatabaseConfig;
pub use error::DatabaseError;
pub use id_allocator::IdAllocator;
pub use models::{GameChanges, GameRecord, IdCounter, MoveRecord, Namespace, PlayerRecord, ID_SPACE};
pub use retry::retry_with_backoff;
pub use stores::{GameStore, MemoryStore, SqliteStore};
