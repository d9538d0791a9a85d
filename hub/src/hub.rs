use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{HubConfig, HubError};

pub type SubscriberId = Uuid;

/// The receiving end handed to a connection. The queue closes when the hub
/// drops the subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<String>,
}

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<String>,
}

struct Unregister {
    id: SubscriberId,
    remaining: oneshot::Sender<usize>,
}

/// Handle to the task that owns one match's subscribers. Cloning is cheap and
/// every clone talks to the same task; the task ends once all handles are
/// gone.
#[derive(Clone)]
pub struct Hub {
    game_id: u32,
    queue_capacity: usize,
    register: UnboundedSender<Subscriber>,
    unregister: UnboundedSender<Unregister>,
    broadcast: UnboundedSender<String>,
    subscribers: Arc<AtomicUsize>,
    retired: Arc<AtomicBool>,
}

impl Hub {
    /// Starts the coordinating task. Must be called inside a tokio runtime.
    pub fn spawn(game_id: u32, config: &HubConfig) -> Self {
        let (register, register_rx) = mpsc::unbounded_channel();
        let (unregister, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast, broadcast_rx) = mpsc::unbounded_channel();
        let subscribers = Arc::new(AtomicUsize::new(0));

        let task = HubTask {
            game_id,
            subscribers: HashMap::new(),
            count: subscribers.clone(),
        };
        tokio::spawn(task.run(register_rx, unregister_rx, broadcast_rx));
        info!(game_id, "hub started");

        Self {
            game_id,
            queue_capacity: config.queue_capacity.max(1),
            register,
            unregister,
            broadcast,
            subscribers,
            retired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    /// Subscribers currently attached, counting ones whose registration is
    /// still queued.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> Result<Subscription, HubError> {
        let (tx, receiver) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();
        self.subscribers.fetch_add(1, Ordering::SeqCst);
        if self.register.send(Subscriber { id, tx }).is_err() {
            self.subscribers.fetch_sub(1, Ordering::SeqCst);
            return Err(HubError::Closed(self.game_id));
        }
        Ok(Subscription { id, receiver })
    }

    /// Drops a subscriber and closes its queue. Returns how many remain.
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<usize, HubError> {
        let (remaining, ack) = oneshot::channel();
        self.unregister
            .send(Unregister { id, remaining })
            .map_err(|_| HubError::Closed(self.game_id))?;
        ack.await.map_err(|_| HubError::Closed(self.game_id))
    }

    /// Queues a payload for every subscriber. Never waits on a subscriber.
    pub fn emit(&self, payload: String) -> Result<(), HubError> {
        self.broadcast
            .send(payload)
            .map_err(|_| HubError::Closed(self.game_id))
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }
}

struct HubTask {
    game_id: u32,
    subscribers: HashMap<SubscriberId, mpsc::Sender<String>>,
    count: Arc<AtomicUsize>,
}

impl HubTask {
    async fn run(
        mut self,
        mut register_rx: UnboundedReceiver<Subscriber>,
        mut unregister_rx: UnboundedReceiver<Unregister>,
        mut broadcast_rx: UnboundedReceiver<String>,
    ) {
        // registrations drain first, then payloads, then removals: whatever a
        // caller queued before unsubscribing is delivered or evicted first
        loop {
            tokio::select! {
                biased;
                Some(subscriber) = register_rx.recv() => {
                    debug!(game_id = self.game_id, subscriber = %subscriber.id, "subscriber registered");
                    self.subscribers.insert(subscriber.id, subscriber.tx);
                }
                Some(payload) = broadcast_rx.recv() => self.fan_out(payload),
                Some(Unregister { id, remaining }) = unregister_rx.recv() => {
                    if self.subscribers.remove(&id).is_some() {
                        self.count.fetch_sub(1, Ordering::SeqCst);
                        debug!(game_id = self.game_id, subscriber = %id, "subscriber unregistered");
                    }
                    let _ = remaining.send(self.subscribers.len());
                }
                else => break,
            }
        }
        info!(game_id = self.game_id, "hub stopped");
    }

    fn fan_out(&mut self, payload: String) {
        let game_id = self.game_id;
        let before = self.subscribers.len();
        self.subscribers
            .retain(|id, tx| match tx.try_send(payload.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(game_id, subscriber = %id, "subscriber queue full, evicting");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(game_id, subscriber = %id, "subscriber went away");
                    false
                }
            });
        let evicted = before - self.subscribers.len();
        if evicted > 0 {
            self.count.fetch_sub(evicted, Ordering::SeqCst);
        }
    }
}
