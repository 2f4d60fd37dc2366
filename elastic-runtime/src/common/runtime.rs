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

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace};

use elastic_core::address::{ActorPath, ActorRef, ActorRefParser, ShardKey};
use elastic_core::common::ElasticError;
use elastic_core::message::{InternalMessageCodec, MessageCodecs};
use elastic_core::traits::{ActorExecution, ActorRefFactory, Message};

use crate::actor::{shard_for, ActorSystem, SystemContext};
use crate::common::cluster_router::ClusterRouter;
use crate::common::{ElasticConfig, RemoteClusterTransport};
use crate::events::{ActorSystemEvent, ActorSystemEventListenerRepository, ActorSystemEventRegistry};
use crate::scheduler::{ScheduledMessageRef, ScheduledMessageRepository, ShardedScheduler};

/// Handle to a running node of the cluster.
///
/// Owns the local actor systems, the scheduler, the event registry and the routing
/// table for remote clusters. Cheap to clone; all clones share one runtime.
#[derive(Clone)]
pub struct ElasticRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    config: ElasticConfig,
    router: Arc<ClusterRouter>,
    codecs: MessageCodecs,
    scheduler: ShardedScheduler,
    events: Arc<ActorSystemEventRegistry>,
    tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl std::fmt::Debug for ElasticRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticRuntime")
            .field("cluster", &self.cluster_name())
            .field("node", &self.node_id())
            .finish_non_exhaustive()
    }
}

impl ElasticRuntime {
    /// Builds the local actor systems and acquires all of their shards.
    #[instrument(skip_all, fields(cluster = %config.cluster.cluster_name, node = %config.cluster.node_id))]
    pub(crate) async fn start(
        config: ElasticConfig,
        scheduled_messages: Arc<dyn ScheduledMessageRepository>,
        listeners: Arc<dyn ActorSystemEventListenerRepository>,
    ) -> Result<Self, ElasticError> {
        config.validate()?;
        let cluster_name = config.cluster.cluster_name.clone();
        let router = ClusterRouter::new(cluster_name.clone());
        let codecs = MessageCodecs::new();
        let scheduler = ShardedScheduler::new(cluster_name.clone(), scheduled_messages, config.scheduler.clone());
        scheduler.bind_router(router.handle());
        let events = Arc::new(ActorSystemEventRegistry::new(listeners, codecs.clone()));
        let tracker = TaskTracker::new();
        let cancellation_token = CancellationToken::new();

        for system_config in config.actor_systems() {
            let context = Arc::new(SystemContext {
                name: system_config.name.clone(),
                cluster_name: cluster_name.clone(),
                node_id: config.cluster.node_id.clone(),
                shard_count: system_config.shards,
                actor_types: DashMap::new(),
                codecs: codecs.clone(),
                scheduler: scheduler.clone(),
                events: Arc::clone(&events),
                router: router.weak(),
                tracker: tracker.clone(),
            });
            router.add_system(ActorSystem::new(context, &cancellation_token));
            debug!(system = %system_config.name, shards = system_config.shards, "actor system created");
        }

        let runtime = Self {
            inner: Arc::new(RuntimeInner {
                config,
                router,
                codecs,
                scheduler,
                events,
                tracker,
                cancellation_token,
            }),
        };

        for system in runtime.actor_systems() {
            for shard_id in 0..system.shard_count() {
                runtime.acquire_shard(system.name(), shard_id).await?;
            }
        }
        info!("runtime started");
        Ok(runtime)
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.inner.config
    }

    pub fn cluster_name(&self) -> &str {
        &self.inner.config.cluster.cluster_name
    }

    pub fn node_id(&self) -> &str {
        &self.inner.config.cluster.node_id
    }

    pub fn actor_system(&self, name: &str) -> Option<ActorSystem> {
        self.inner.router.system(name)
    }

    /// Local actor systems, ordered by name.
    pub fn actor_systems(&self) -> Vec<ActorSystem> {
        self.inner.router.systems()
    }

    /// Makes `M` decodable by actors and event listeners of this runtime.
    pub fn register_message<M: Message>(&self) {
        self.inner.codecs.register::<M>();
    }

    pub fn codecs(&self) -> &MessageCodecs {
        &self.inner.codecs
    }

    /// Parser producing refs bound to this runtime.
    pub fn refs(&self) -> ActorRefParser {
        self.inner.router.refs()
    }

    /// Parses a ref spec into a ref bound to this runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] for malformed specs.
    pub fn actor_ref(&self, spec: &str) -> Result<ActorRef, ElasticError> {
        self.refs().create(spec)
    }

    /// Ref to persistent actor `actor_id` of a configured remote actor system.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] when (`cluster`, `actor_system`) is not configured.
    pub fn remote_actor_for(&self, cluster: &str, actor_system: &str, actor_id: &str) -> Result<ActorRef, ElasticError> {
        let remote = self
            .inner
            .config
            .remote_actor_system(cluster, actor_system)
            .ok_or_else(|| {
                ElasticError::Addressing(format!("remote actor system {cluster}/{actor_system} is not configured"))
            })?;
        let path = ActorPath::Shard {
            shard: ShardKey::new(actor_system, shard_for(actor_id, remote.shards)),
            actor_id: actor_id.to_owned(),
        };
        ActorRef::new(cluster, path, true, Some(self.inner.router.handle()))
    }

    /// Routes envelopes for remote refs in `cluster` through `transport`.
    pub fn register_remote_cluster(&self, cluster: impl Into<String>, transport: Arc<dyn RemoteClusterTransport>) {
        self.inner.router.register_transport(cluster, transport);
    }

    /// Accepts an envelope received from a remote cluster.
    ///
    /// # Errors
    ///
    /// Decoding errors, and routing errors for the decoded envelope.
    pub fn deliver_encoded(&self, envelope: &[u8]) -> Result<(), ElasticError> {
        let message = InternalMessageCodec::decode(envelope, &self.refs())?;
        trace!(receiver = %message.receiver(), message_type = message.payload_type_name(), "received remote envelope");
        self.inner.router.deliver(message)
    }

    /// Takes ownership of a shard: loads its scheduled messages and fires
    /// [`ActorSystemEvent::ActorShardInitialized`].
    ///
    /// # Errors
    ///
    /// * [`ElasticError::Addressing`] for an unknown system or shard.
    /// * Repository errors from loading the shard's schedule.
    #[instrument(skip(self))]
    pub async fn acquire_shard(&self, actor_system: &str, shard_id: u32) -> Result<(), ElasticError> {
        let system = self.require_system(actor_system)?;
        let shard = system
            .shard(shard_id)
            .ok_or_else(|| ElasticError::Addressing(format!("{actor_system} has no shard {shard_id}")))?;
        shard.set_owned(true);
        if let Err(e) = self.inner.scheduler.register_shard(shard.key()).await {
            shard.set_owned(false);
            return Err(e);
        }
        self.inner
            .events
            .generate_events(shard, ActorSystemEvent::ActorShardInitialized)
            .await;
        debug!(shard = %shard.key(), "shard acquired");
        Ok(())
    }

    /// Gives up ownership of a shard: fires [`ActorSystemEvent::ActorShardReleased`]
    /// and cancels its in-memory timers. Persisted schedules stay in the repository.
    ///
    /// # Errors
    ///
    /// [`ElasticError::Addressing`] for an unknown system or shard.
    #[instrument(skip(self))]
    pub async fn release_shard(&self, actor_system: &str, shard_id: u32) -> Result<(), ElasticError> {
        let system = self.require_system(actor_system)?;
        let shard = system
            .shard(shard_id)
            .ok_or_else(|| ElasticError::Addressing(format!("{actor_system} has no shard {shard_id}")))?;
        self.inner
            .events
            .generate_events(shard, ActorSystemEvent::ActorShardReleased)
            .await;
        self.inner.scheduler.unregister_shard(shard.key());
        shard.set_owned(false);
        debug!(shard = %shard.key(), "shard released");
        Ok(())
    }

    /// Cancels a scheduled message by its ref.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] when the message belongs to another cluster.
    pub async fn cancel_scheduled(&self, message: &ScheduledMessageRef) -> Result<(), ElasticError> {
        if message.cluster() != self.cluster_name() {
            return Err(ElasticError::Addressing(format!("{message} belongs to another cluster")));
        }
        self.inner.scheduler.cancel(message.shard(), message.key()).await;
        Ok(())
    }

    pub fn scheduler(&self) -> &ShardedScheduler {
        &self.inner.scheduler
    }

    pub fn events(&self) -> &Arc<ActorSystemEventRegistry> {
        &self.inner.events
    }

    /// Stops timers, containers and actors, waiting up to the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::IllegalState`] when tasks are still running after the timeout.
    pub async fn shutdown(&self) -> Result<(), ElasticError> {
        trace!("shutting down runtime");
        self.inner.scheduler.shutdown();
        self.inner.cancellation_token.cancel();
        self.inner.tracker.close();

        let timeout = self.inner.config.system_shutdown_timeout();
        if tokio::time::timeout(timeout, self.inner.tracker.wait()).await.is_err() {
            error!(
                timeout_ms = timeout.as_millis(),
                remaining = self.inner.tracker.len(),
                "Shutdown timeout expired with tasks still running"
            );
            return Err(ElasticError::IllegalState(format!(
                "runtime shutdown timed out after {} ms",
                timeout.as_millis()
            )));
        }
        info!("runtime stopped");
        Ok(())
    }

    fn require_system(&self, name: &str) -> Result<ActorSystem, ElasticError> {
        self.actor_system(name)
            .ok_or_else(|| ElasticError::Addressing(format!("unknown actor system {name}")))
    }
}

/// Code running outside any actor has no implied sender.
impl ActorExecution for ElasticRuntime {
    fn current_actor(&self) -> Option<&ActorRef> {
        None
    }
}
