use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{Namespace, ID_SPACE};
use crate::stores::GameStore;
use crate::DatabaseError;

/// How often a lost compare-and-set is retried before giving up.
const MAX_COUNTER_RACES: usize = 16;

/// Hands out collision-free ids per namespace. Allocations in one namespace
/// are serialized inside the process; the counter update is a
/// compare-and-set so other processes sharing the store cannot hand out the
/// same id either.
pub struct IdAllocator {
    store: Arc<dyn GameStore>,
    games: Mutex<()>,
    players: Mutex<()>,
}

impl IdAllocator {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            games: Mutex::new(()),
            players: Mutex::new(()),
        }
    }

    fn lock_for(&self, namespace: Namespace) -> &Mutex<()> {
        match namespace {
            Namespace::Games => &self.games,
            Namespace::Players => &self.players,
        }
    }

    pub async fn allocate(&self, namespace: Namespace) -> Result<u32, DatabaseError> {
        let _guard = self.lock_for(namespace).lock().await;

        for race in 0..MAX_COUNTER_RACES {
            let counter = self
                .store
                .load_counter(namespace)
                .await?
                .ok_or_else(|| DatabaseError::CounterNotFound(namespace.to_string()))?;

            let mut count = counter.count;
            let mut probed = 0;
            let id = loop {
                if probed == ID_SPACE {
                    return Err(DatabaseError::IdSpaceExhausted(namespace.to_string()));
                }
                count = count.wrapping_add(1);
                probed += 1;
                let candidate = counter.candidate(count);
                if candidate != 0 && !self.store.id_exists(namespace, candidate).await? {
                    break candidate;
                }
            };

            if self
                .store
                .compare_and_set_count(namespace, counter.count, count)
                .await?
            {
                tracing::debug!(namespace = %namespace, id, "allocated id");
                return Ok(id);
            }
            tracing::warn!(
                "counter for {} moved during allocation (race {}), re-reading",
                namespace,
                race + 1
            );
        }

        Err(DatabaseError::RetryExhausted(format!(
            "allocating a {namespace} id"
        )))
    }

    pub async fn allocate_many(
        &self,
        namespace: Namespace,
        n: usize,
    ) -> Result<Vec<u32>, DatabaseError> {
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            ids.push(self.allocate(namespace).await?);
        }
        Ok(ids)
    }
}
