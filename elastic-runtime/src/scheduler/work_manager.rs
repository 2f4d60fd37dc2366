/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Per-shard in-memory timers for scheduled messages.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use elastic_core::address::ShardKey;

use crate::scheduler::{ScheduledMessage, ScheduledMessageKey};

/// Runs a matured scheduled message.
#[async_trait]
pub trait WorkExecutor: Send + Sync {
    async fn execute(&self, shard: &ShardKey, message: ScheduledMessage);
}

/// Lifecycle of a shard inside the work manager.
///
/// `Unregistered → Loading → Active → Unregistering → Unregistered`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardState {
    Unregistered,
    Loading,
    Active,
    Unregistering,
}

impl ShardState {
    /// Whether timers may be armed for the shard.
    pub const fn accepts_work(self) -> bool {
        matches!(self, Self::Loading | Self::Active)
    }
}

struct ShardSchedule {
    state: ShardState,
    horizon: DateTime<Utc>,
    timers: HashMap<ScheduledMessageKey, AbortHandle>,
    refill: Option<AbortHandle>,
}

impl ShardSchedule {
    fn abort_all(&mut self) -> usize {
        let count = self.timers.len();
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        if let Some(refill) = self.refill.take() {
            refill.abort();
        }
        count
    }
}

struct WorkManagerInner {
    shards: DashMap<ShardKey, ShardSchedule>,
    executor: Arc<dyn WorkExecutor>,
}

/// Holds one timer per admitted scheduled message, grouped by shard.
///
/// Timers are tokio tasks on the shared runtime: registering a shard allocates no
/// threads, and only maturing timers occupy a worker. A message is admitted only
/// while its shard is loading or active and its fire time lies within the shard's
/// horizon; the horizon is advanced by the owner of the repository.
#[derive(Clone)]
pub struct ScheduledWorkManager {
    inner: Arc<WorkManagerInner>,
}

impl std::fmt::Debug for ScheduledWorkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledWorkManager")
            .field("shards", &self.inner.shards.len())
            .finish()
    }
}

impl ScheduledWorkManager {
    pub fn new(executor: Arc<dyn WorkExecutor>) -> Self {
        Self {
            inner: Arc::new(WorkManagerInner {
                shards: DashMap::new(),
                executor,
            }),
        }
    }

    /// Moves `shard` to `Loading` with the given horizon, dropping any timers left
    /// from a previous registration.
    pub fn begin_loading(&self, shard: &ShardKey, horizon: DateTime<Utc>) {
        let mut entry = self.inner.shards.entry(shard.clone()).or_insert_with(|| ShardSchedule {
            state: ShardState::Unregistered,
            horizon,
            timers: HashMap::new(),
            refill: None,
        });
        let dropped = entry.abort_all();
        entry.state = ShardState::Loading;
        entry.horizon = horizon;
        debug!(%shard, dropped, %horizon, "shard loading");
    }

    /// Moves a loading shard to `Active`. Returns `false` if it was unregistered
    /// in the meantime.
    pub fn activate(&self, shard: &ShardKey) -> bool {
        match self.inner.shards.get_mut(shard) {
            Some(mut entry) if entry.state == ShardState::Loading => {
                entry.state = ShardState::Active;
                debug!(%shard, armed = entry.timers.len(), "shard active");
                true
            }
            _ => false,
        }
    }

    /// Attaches the task that advances the shard's horizon. Aborted on unregister.
    pub fn set_refill(&self, shard: &ShardKey, refill: AbortHandle) {
        match self.inner.shards.get_mut(shard) {
            Some(mut entry) if entry.state.accepts_work() => {
                if let Some(previous) = entry.refill.replace(refill) {
                    previous.abort();
                }
            }
            _ => refill.abort(),
        }
    }

    /// Moves the horizon of an active shard forward to `until`.
    ///
    /// Returns the previous horizon, or `None` when the shard is not active or the
    /// horizon would not move.
    pub fn advance_horizon(&self, shard: &ShardKey, until: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut entry = self.inner.shards.get_mut(shard)?;
        if entry.state != ShardState::Active || until <= entry.horizon {
            return None;
        }
        Some(std::mem::replace(&mut entry.horizon, until))
    }

    /// Cancels every timer of `shard` and forgets it. Persisted rows are untouched.
    ///
    /// Returns the number of timers cancelled.
    pub fn unregister(&self, shard: &ShardKey) -> usize {
        if let Some(mut entry) = self.inner.shards.get_mut(shard) {
            entry.state = ShardState::Unregistering;
        }
        let cancelled = self
            .inner
            .shards
            .remove(shard)
            .map_or(0, |(_, mut schedule)| schedule.abort_all());
        debug!(%shard, cancelled, "shard unregistered");
        cancelled
    }

    /// Arms a timer for `message` if its shard accepts work and it is due within the
    /// horizon. Returns `true` only when a new timer was armed.
    pub fn schedule(&self, shard: &ShardKey, message: ScheduledMessage) -> bool {
        let Some(mut entry) = self.inner.shards.get_mut(shard) else {
            return false;
        };
        if !entry.state.accepts_work() || message.fire_time() > entry.horizon {
            return false;
        }
        if entry.timers.contains_key(message.key()) {
            return false;
        }

        let key = message.key().clone();
        let task = tokio::spawn(run_timer(Arc::downgrade(&self.inner), shard.clone(), message));
        entry.timers.insert(key, task.abort_handle());
        true
    }

    /// Cancels the timer for `key`. Returns whether one was armed.
    pub fn unschedule(&self, shard: &ShardKey, key: &ScheduledMessageKey) -> bool {
        let removed = self
            .inner
            .shards
            .get_mut(shard)
            .and_then(|mut entry| entry.timers.remove(key));
        match removed {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    pub fn state(&self, shard: &ShardKey) -> ShardState {
        self.inner
            .shards
            .get(shard)
            .map_or(ShardState::Unregistered, |entry| entry.state)
    }

    /// Number of armed timers for `shard`.
    pub fn armed(&self, shard: &ShardKey) -> usize {
        self.inner.shards.get(shard).map_or(0, |entry| entry.timers.len())
    }

    pub fn is_armed(&self, shard: &ShardKey, key: &ScheduledMessageKey) -> bool {
        self.inner
            .shards
            .get(shard)
            .is_some_and(|entry| entry.timers.contains_key(key))
    }

    pub fn registered_shards(&self) -> Vec<ShardKey> {
        self.inner.shards.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Unregisters every shard.
    pub fn shutdown(&self) {
        for shard in self.registered_shards() {
            self.unregister(&shard);
        }
    }
}

async fn run_timer(inner: Weak<WorkManagerInner>, shard: ShardKey, message: ScheduledMessage) {
    // Never fire early, even if the sleep returns before the wall clock catches up.
    while let Ok(remaining) = (message.fire_time() - Utc::now()).to_std() {
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(remaining).await;
    }

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let still_armed = inner
        .shards
        .get_mut(&shard)
        .is_some_and(|mut entry| entry.timers.remove(message.key()).is_some());
    if !still_armed {
        trace!(%shard, message_id = %message.id(), "timer cancelled before firing");
        return;
    }

    trace!(%shard, message_id = %message.id(), "timer fired");
    let executor = Arc::clone(&inner.executor);
    drop(inner);
    executor.execute(&shard, message).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;
    use parking_lot::Mutex;

    use super::*;
    use elastic_core::address::ActorRef;
    use elastic_core::message::MessagePayload;

    #[derive(Default)]
    struct RecordingExecutor {
        fired: Mutex<Vec<(ScheduledMessageKey, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl WorkExecutor for RecordingExecutor {
        async fn execute(&self, _shard: &ShardKey, message: ScheduledMessage) {
            self.fired.lock().push((message.key().clone(), Utc::now()));
        }
    }

    fn message(shard: &ShardKey, delay_ms: i64) -> ScheduledMessage {
        let actor = ActorRef::shard("local", shard.clone(), "a", None).unwrap();
        ScheduledMessage::new(
            actor.clone(),
            actor,
            MessagePayload::new("Tick", Vec::new(), true),
            Utc::now() + ChronoDuration::milliseconds(delay_ms),
        )
    }

    fn manager() -> (ScheduledWorkManager, Arc<RecordingExecutor>) {
        let executor = Arc::new(RecordingExecutor::default());
        (ScheduledWorkManager::new(executor.clone()), executor)
    }

    #[tokio::test]
    async fn unregistered_shards_reject_work() {
        let (manager, _) = manager();
        let shard = ShardKey::new("s", 0);
        assert_eq!(manager.state(&shard), ShardState::Unregistered);
        assert!(!manager.schedule(&shard, message(&shard, 10)));
    }

    #[tokio::test]
    async fn timers_fire_once_and_not_early() {
        let (manager, executor) = manager();
        let shard = ShardKey::new("s", 0);
        manager.begin_loading(&shard, Utc::now() + ChronoDuration::hours(1));
        assert!(manager.activate(&shard));

        let messages: Vec<_> = [50, 80, 120].iter().map(|d| message(&shard, *d)).collect();
        for m in &messages {
            assert!(manager.schedule(&shard, m.clone()));
            assert!(!manager.schedule(&shard, m.clone()));
        }
        assert_eq!(manager.armed(&shard), 3);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let fired = executor.fired.lock().clone();
        assert_eq!(fired.len(), 3);
        for (key, at) in fired {
            assert!(at >= key.fire_time());
        }
        assert_eq!(manager.armed(&shard), 0);
    }

    #[tokio::test]
    async fn messages_beyond_horizon_wait() {
        let (manager, _) = manager();
        let shard = ShardKey::new("s", 1);
        manager.begin_loading(&shard, Utc::now() + ChronoDuration::seconds(1));
        manager.activate(&shard);
        assert!(!manager.schedule(&shard, message(&shard, 5_000)));

        let previous = manager.advance_horizon(&shard, Utc::now() + ChronoDuration::seconds(10));
        assert!(previous.is_some());
        assert!(manager.schedule(&shard, message(&shard, 5_000)));
    }

    #[tokio::test]
    async fn unschedule_and_unregister_cancel_timers() {
        let (manager, executor) = manager();
        let shard = ShardKey::new("s", 2);
        manager.begin_loading(&shard, Utc::now() + ChronoDuration::hours(1));
        manager.activate(&shard);

        let cancelled = message(&shard, 50);
        manager.schedule(&shard, cancelled.clone());
        manager.schedule(&shard, message(&shard, 60));
        assert!(manager.unschedule(&shard, cancelled.key()));
        assert!(!manager.unschedule(&shard, cancelled.key()));

        assert_eq!(manager.unregister(&shard), 1);
        assert_eq!(manager.state(&shard), ShardState::Unregistered);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(executor.fired.lock().is_empty());
    }
}
