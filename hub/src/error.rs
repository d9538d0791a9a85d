use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("No hub for game {0}")]
    HubNotFound(u32),

    #[error("Hub for game {0} has shut down")]
    Closed(u32),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
