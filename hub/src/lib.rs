pub mod config;
pub mod error;
pub mod hub;
pub mod registry;

pub use config::{HubConfig, DEFAULT_QUEUE_CAPACITY};
pub use error::HubError;
pub use hub::{Hub, SubscriberId, Subscription};
pub use registry::{Envelope, HubRegistry};
