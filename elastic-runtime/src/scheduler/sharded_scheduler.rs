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

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, instrument, trace, warn};

use elastic_core::address::{ActorRef, ActorRefKind, ShardKey};
use elastic_core::common::ElasticError;
use elastic_core::message::MessagePayload;
use elastic_core::traits::{Message, MessageRouter};

use crate::common::SchedulerConfig;
use crate::scheduler::{
    ScheduledMessage, ScheduledMessageKey, ScheduledMessageRef, ScheduledMessageRepository,
    ScheduledWorkManager, ShardState, WorkExecutor,
};

/// Delivers a matured message, then deletes its row.
///
/// The two steps are not atomic: a crash in between redelivers the message when the
/// shard is next registered. Once a router is bound, rows are delivered through it
/// rather than through whatever runtime created their refs.
struct DeliverAndDelete {
    repository: Arc<dyn ScheduledMessageRepository>,
    router: RwLock<Option<Weak<dyn MessageRouter>>>,
}

#[async_trait]
impl WorkExecutor for DeliverAndDelete {
    async fn execute(&self, shard: &ShardKey, message: ScheduledMessage) {
        debug!(
            %shard,
            message_id = %message.id(),
            receiver = %message.receiver(),
            message_type = message.message_type(),
            "delivering scheduled message"
        );
        let router = self.router.read().clone();
        match router {
            Some(router) => {
                let sender = message.sender().with_router(router.clone());
                message
                    .receiver()
                    .with_router(router)
                    .tell_payload(message.payload().clone(), Some(&sender));
            }
            None => message
                .receiver()
                .tell_payload(message.payload().clone(), Some(message.sender())),
        }
        if let Err(e) = self.repository.delete(shard, message.key()).await {
            error!(%shard, message_id = %message.id(), error = %e, "Failed to delete fired scheduled message");
        }
    }
}

struct SchedulerInner {
    cluster_name: String,
    repository: Arc<dyn ScheduledMessageRepository>,
    executor: Arc<DeliverAndDelete>,
    work_manager: ScheduledWorkManager,
    config: SchedulerConfig,
}

/// Persistence-backed, per-shard delayed delivery.
///
/// Every scheduled message is written to the repository before a timer is armed.
/// Timers exist only for shards registered on this node, and only for messages due
/// within the configured load window; a per-shard refill task admits later messages
/// as the window advances.
#[derive(Clone)]
pub struct ShardedScheduler {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for ShardedScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedScheduler")
            .field("cluster_name", &self.inner.cluster_name)
            .field("work_manager", &self.inner.work_manager)
            .finish()
    }
}

impl ShardedScheduler {
    pub fn new(
        cluster_name: impl Into<String>,
        repository: Arc<dyn ScheduledMessageRepository>,
        config: SchedulerConfig,
    ) -> Self {
        let executor = Arc::new(DeliverAndDelete {
            repository: Arc::clone(&repository),
            router: RwLock::new(None),
        });
        Self {
            inner: Arc::new(SchedulerInner {
                cluster_name: cluster_name.into(),
                repository,
                executor: Arc::clone(&executor),
                work_manager: ScheduledWorkManager::new(executor),
                config,
            }),
        }
    }

    /// Delivers matured messages through `router`.
    pub fn bind_router(&self, router: Weak<dyn MessageRouter>) {
        *self.inner.executor.router.write() = Some(router);
    }

    /// Takes ownership of `shard`: loads its due messages page by page and arms a
    /// timer for each. Re-registering an active shard reloads it from scratch.
    ///
    /// Returns the number of timers armed.
    ///
    /// # Errors
    ///
    /// Returns the repository error if loading fails; the shard is left unregistered.
    #[instrument(skip(self, shard), fields(shard = %shard))]
    pub async fn register_shard(&self, shard: &ShardKey) -> Result<usize, ElasticError> {
        let inner = &self.inner;
        let horizon = Utc::now() + window(&inner.config);
        inner.work_manager.begin_loading(shard, horizon);

        let armed = match self.admit(shard, None, horizon).await {
            Ok(armed) => armed,
            Err(e) => {
                error!(error = %e, "Failed to load scheduled messages");
                inner.work_manager.unregister(shard);
                return Err(e);
            }
        };

        if inner.work_manager.activate(shard) {
            let refill = tokio::spawn(refill_loop(
                Arc::downgrade(inner),
                shard.clone(),
                inner.config.refill_interval(),
            ));
            inner.work_manager.set_refill(shard, refill.abort_handle());
        }
        debug!(armed, "registered shard with scheduler");
        Ok(armed)
    }

    /// Releases `shard`: cancels its timers and keeps its rows.
    pub fn unregister_shard(&self, shard: &ShardKey) {
        let cancelled = self.inner.work_manager.unregister(shard);
        debug!(%shard, cancelled, "unregistered shard from scheduler");
    }

    /// Schedules `message` for delivery to `receiver` after `delay`.
    ///
    /// # Errors
    ///
    /// * [`ElasticError::SchedulingPrecondition`] unless `sender` is a persistent
    ///   shard actor on a shard registered with this scheduler.
    /// * [`ElasticError::Serialization`] when the message cannot be encoded.
    /// * [`ElasticError::Repository`] when the row cannot be persisted.
    pub async fn schedule_once<M: Message>(
        &self,
        sender: &ActorRef,
        message: &M,
        receiver: &ActorRef,
        delay: Duration,
    ) -> Result<ScheduledMessageRef, ElasticError> {
        self.check_sender(sender)?;
        let payload = MessagePayload::from_message(message)?;
        self.schedule_payload(sender, payload, receiver, delay).await
    }

    /// Schedules an already serialized payload.
    ///
    /// # Errors
    ///
    /// See [`ShardedScheduler::schedule_once`].
    #[instrument(skip(self, sender, payload, receiver), fields(sender = %sender, receiver = %receiver, message_type = payload.type_name()))]
    pub async fn schedule_payload(
        &self,
        sender: &ActorRef,
        payload: MessagePayload,
        receiver: &ActorRef,
        delay: Duration,
    ) -> Result<ScheduledMessageRef, ElasticError> {
        let shard = self.check_sender(sender)?;
        let delay = chrono::Duration::from_std(delay)
            .map_err(|_| ElasticError::IllegalState(format!("delay {delay:?} is out of range")))?;
        let fire_time = (Utc::now() + delay).trunc_subsecs(3);

        let message = ScheduledMessage::new(sender.clone(), receiver.clone(), payload, fire_time);
        self.inner.repository.create(&shard, &message).await?;
        let key = message.key().clone();
        let armed = self.inner.work_manager.schedule(&shard, message);
        trace!(message_id = %key.id(), %fire_time, armed, "scheduled message persisted");

        Ok(ScheduledMessageRef::new(&self.inner.cluster_name, shard, key))
    }

    /// Cancels a scheduled message: drops its timer if armed and deletes its row if
    /// present. Unknown, fired or already cancelled keys are a no-op.
    #[instrument(skip(self, shard, key), fields(shard = %shard, message_id = %key.id()))]
    pub async fn cancel(&self, shard: &ShardKey, key: &ScheduledMessageKey) {
        let unscheduled = self.inner.work_manager.unschedule(shard, key);
        if let Err(e) = self.inner.repository.delete(shard, key).await {
            error!(error = %e, "Failed to delete cancelled scheduled message");
        }
        trace!(unscheduled, "cancelled scheduled message");
    }

    pub fn shard_state(&self, shard: &ShardKey) -> ShardState {
        self.inner.work_manager.state(shard)
    }

    /// Number of timers currently armed for `shard`.
    pub fn armed_timers(&self, shard: &ShardKey) -> usize {
        self.inner.work_manager.armed(shard)
    }

    pub fn is_armed(&self, shard: &ShardKey, key: &ScheduledMessageKey) -> bool {
        self.inner.work_manager.is_armed(shard, key)
    }

    pub fn repository(&self) -> &Arc<dyn ScheduledMessageRepository> {
        &self.inner.repository
    }

    /// Cancels all timers of all shards. Rows are kept.
    pub fn shutdown(&self) {
        self.inner.work_manager.shutdown();
    }

    fn check_sender(&self, sender: &ActorRef) -> Result<ShardKey, ElasticError> {
        match (sender.kind(), sender.shard_key()) {
            (ActorRefKind::PersistentShard, Some(shard))
                if sender.cluster() == self.inner.cluster_name
                    && self.inner.work_manager.state(shard).accepts_work() =>
            {
                Ok(shard.clone())
            }
            _ => Err(ElasticError::SchedulingPrecondition(sender.spec().to_string())),
        }
    }

    async fn admit(
        &self,
        shard: &ShardKey,
        after: Option<ScheduledMessageKey>,
        until: DateTime<Utc>,
    ) -> Result<usize, ElasticError> {
        admit_window(&self.inner, shard, after, until).await
    }
}

fn window(config: &SchedulerConfig) -> chrono::Duration {
    chrono::Duration::from_std(config.load_window()).unwrap_or_else(|_| chrono::Duration::days(1))
}

async fn admit_window(
    inner: &SchedulerInner,
    shard: &ShardKey,
    mut cursor: Option<ScheduledMessageKey>,
    until: DateTime<Utc>,
) -> Result<usize, ElasticError> {
    let batch = inner.config.load_batch_size.max(1);
    let mut armed = 0;
    loop {
        let page = inner
            .repository
            .get_window(shard, cursor.as_ref(), until, batch)
            .await?;
        let fetched = page.len();
        if let Some(last) = page.last() {
            cursor = Some(last.key().clone());
        }
        for message in page {
            if inner.work_manager.schedule(shard, message) {
                armed += 1;
            }
        }
        if fetched < batch {
            return Ok(armed);
        }
    }
}

async fn refill_loop(inner: Weak<SchedulerInner>, shard: ShardKey, every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let until = Utc::now() + window(&inner.config);
        let Some(previous) = inner.work_manager.advance_horizon(&shard, until) else {
            continue;
        };
        match admit_window(&inner, &shard, Some(ScheduledMessageKey::last_at(previous)), until).await {
            Ok(armed) => trace!(%shard, armed, %until, "advanced scheduling window"),
            Err(e) => warn!(%shard, error = %e, "Failed to advance scheduling window"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::InMemoryScheduledMessageRepository;
    use elastic_core::address::NodeKey;

    fn scheduler(repository: Arc<InMemoryScheduledMessageRepository>, config: SchedulerConfig) -> ShardedScheduler {
        ShardedScheduler::new("local", repository, config)
    }

    fn actor(shard: &ShardKey, id: &str) -> ActorRef {
        ActorRef::shard("local", shard.clone(), id, None).unwrap()
    }

    #[tokio::test]
    async fn senders_must_be_registered_shard_actors() {
        let repository = Arc::new(InMemoryScheduledMessageRepository::new());
        let scheduler = scheduler(repository.clone(), SchedulerConfig::default());
        let shard = ShardKey::new("s", 0);
        let receiver = actor(&shard, "r");
        let payload = MessagePayload::new("Tick", Vec::new(), true);
        let delay = Duration::from_secs(60);

        let unowned = scheduler
            .schedule_payload(&actor(&shard, "a"), payload.clone(), &receiver, delay)
            .await;
        assert!(matches!(unowned, Err(ElasticError::SchedulingPrecondition(_))));

        scheduler.register_shard(&shard).await.unwrap();
        let temp = ActorRef::node("local", NodeKey::new("s", "n"), Some("tmp".into()), None).unwrap();
        let service = ActorRef::service("local", NodeKey::new("s", "n"), "clock", None).unwrap();
        for sender in [temp, service] {
            let result = scheduler.schedule_payload(&sender, payload.clone(), &receiver, delay).await;
            match result {
                Err(ElasticError::SchedulingPrecondition(spec)) => assert_eq!(spec, sender.spec()),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(repository.is_empty(&shard));
    }

    #[tokio::test]
    async fn refill_admits_messages_entering_the_window() {
        let repository = Arc::new(InMemoryScheduledMessageRepository::new());
        let config = SchedulerConfig {
            load_window_ms: 200,
            load_batch_size: 2,
            refill_interval_ms: 50,
        };
        let scheduler = scheduler(repository.clone(), config);
        let shard = ShardKey::new("s", 0);
        scheduler.register_shard(&shard).await.unwrap();

        let sender = actor(&shard, "a");
        let payload = MessagePayload::new("Tick", Vec::new(), true);
        let later = scheduler
            .schedule_payload(&sender, payload, &sender, Duration::from_millis(400))
            .await
            .unwrap();
        assert!(!scheduler.is_armed(&shard, later.key()));
        assert!(repository.contains(&shard, later.key()));

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(!repository.contains(&shard, later.key()));
    }

    #[tokio::test]
    async fn reregistration_keeps_rows_outside_the_window() {
        let repository = Arc::new(InMemoryScheduledMessageRepository::new());
        let scheduler = scheduler(repository.clone(), SchedulerConfig::default());
        let shard = ShardKey::new("s", 3);
        scheduler.register_shard(&shard).await.unwrap();

        let sender = actor(&shard, "a");
        let payload = MessagePayload::new("Tick", Vec::new(), true);
        let near = scheduler
            .schedule_payload(&sender, payload.clone(), &sender, Duration::from_secs(60))
            .await
            .unwrap();
        let far = scheduler
            .schedule_payload(&sender, payload, &sender, Duration::from_secs(2 * 3600))
            .await
            .unwrap();
        assert!(scheduler.is_armed(&shard, near.key()));
        assert!(!scheduler.is_armed(&shard, far.key()));

        scheduler.unregister_shard(&shard);
        assert_eq!(scheduler.armed_timers(&shard), 0);
        assert_eq!(repository.len(&shard), 2);

        assert_eq!(scheduler.register_shard(&shard).await.unwrap(), 1);
        assert_eq!(scheduler.shard_state(&shard), ShardState::Active);
        scheduler.shutdown();
    }
}
