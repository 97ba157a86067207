//! Process-wide table of active watches, one per chat.
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use teloxide::types::ChatId;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::scheduler::PollTimer;

/// Snapshot of a chat's tracking state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Generation id; a restart for the same chat gets a fresh one.
    pub id: Uuid,
    pub chat_id: ChatId,
    pub account: String,
    /// Activity at or before this instant has already been reported.
    pub watermark: DateTime<Utc>,
}

struct Watch {
    subscription: Subscription,
    timer: PollTimer,
}

pub struct WatchRegistry {
    clock: Arc<dyn Clock>,
    watches: RwLock<HashMap<ChatId, Watch>>,
}

impl fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watches", &self.len())
            .finish_non_exhaustive()
    }
}

impl WatchRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            watches: RwLock::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Begin tracking `account` for `chat_id` from the current instant.
    ///
    /// An existing watch for the chat is cancelled and replaced under the same
    /// lock, so a chat never has two timers. `arm` receives the new
    /// subscription and returns the timer that will drive it.
    pub fn start_watch<F>(&self, chat_id: ChatId, account: &str, arm: F) -> Subscription
    where
        F: FnOnce(&Subscription) -> PollTimer,
    {
        let subscription = Subscription {
            id: Uuid::new_v4(),
            chat_id,
            account: account.to_string(),
            watermark: self.clock.now(),
        };

        let mut watches = self.watches.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = watches.remove(&chat_id) {
            previous.timer.cancel();
            info!(%chat_id, account = %previous.subscription.account, "replaced existing watch");
        }
        let timer = arm(&subscription);
        watches.insert(
            chat_id,
            Watch {
                subscription: subscription.clone(),
                timer,
            },
        );
        subscription
    }

    /// Cancel and remove the chat's watch. Returns whether one existed.
    pub fn stop_watch(&self, chat_id: ChatId) -> bool {
        let removed = self
            .watches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&chat_id);
        match removed {
            Some(watch) => {
                watch.timer.cancel();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, chat_id: ChatId) -> Option<Subscription> {
        self.watches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chat_id)
            .map(|w| w.subscription.clone())
    }

    /// Move the watermark of generation `id` to `to`. A no-op once that
    /// generation was stopped or replaced.
    pub fn advance_watermark(&self, chat_id: ChatId, id: Uuid, to: DateTime<Utc>) -> bool {
        let mut watches = self.watches.write().unwrap_or_else(PoisonError::into_inner);
        match watches.get_mut(&chat_id) {
            Some(watch) if watch.subscription.id == id => {
                watch.subscription.watermark = to;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.watches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every watch, cancelling its timer, and hand the timers back so
    /// the caller can wait for them.
    pub fn drain(&self) -> Vec<PollTimer> {
        let mut watches = self.watches.write().unwrap_or_else(PoisonError::into_inner);
        watches
            .drain()
            .map(|(_, watch)| {
                watch.timer.cancel();
                watch.timer
            })
            .collect()
    }
}
