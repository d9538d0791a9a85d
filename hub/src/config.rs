use serde::Deserialize;

/// Outbound queue length per subscriber. A subscriber whose queue is full
/// when a message goes out is dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
