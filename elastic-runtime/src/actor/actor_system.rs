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

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

use elastic_core::address::{ActorPath, ActorRef, ShardKey};
use elastic_core::common::ElasticError;
use elastic_core::message::{
    ActivateActor, CreateActor, DestroyActor, InternalMessage, MessageCodecs, MessagePayload,
};

use crate::actor::reply::{ReplyActor, ReplySender};
use crate::actor::{ActorFactory, ActorNode, ActorShard, ElasticActor, SystemContext};

/// A named actor system hosted by this node: its shards, its node container and its
/// registered actor types.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<ActorSystemInner>,
}

struct ActorSystemInner {
    context: Arc<SystemContext>,
    shards: Vec<Arc<ActorShard>>,
    node: Arc<ActorNode>,
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSystem")
            .field("name", &self.name())
            .field("shards", &self.shard_count())
            .field("node", self.inner.node.key())
            .finish()
    }
}

impl ActorSystem {
    pub(crate) fn new(context: Arc<SystemContext>, cancel: &CancellationToken) -> Self {
        let shards = (0..context.shard_count)
            .map(|shard_id| {
                Arc::new(ActorShard::new(
                    ShardKey::new(context.name.clone(), shard_id),
                    Arc::clone(&context),
                    cancel.child_token(),
                ))
            })
            .collect();
        let node = Arc::new(ActorNode::new(context.node_key(), Arc::clone(&context), cancel.child_token()));
        Self {
            inner: Arc::new(ActorSystemInner { context, shards, node }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.context.name
    }

    pub fn shard_count(&self) -> u32 {
        self.inner.context.shard_count
    }

    pub fn codecs(&self) -> &MessageCodecs {
        &self.inner.context.codecs
    }

    /// Registers the factory used to instantiate actors of `actor_type`.
    pub fn register_actor_type<F>(&self, actor_type: impl Into<String>, factory: F)
    where
        F: Fn(&str, Option<&[u8]>) -> anyhow::Result<Box<dyn ElasticActor>> + Send + Sync + 'static,
    {
        let factory: ActorFactory = Arc::new(factory);
        self.inner.context.actor_types.insert(actor_type.into(), factory);
    }

    pub fn is_actor_type_registered(&self, actor_type: &str) -> bool {
        self.inner.context.actor_types.contains_key(actor_type)
    }

    /// Hosts `actor` as service `service_id` on this node and returns its ref.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] for an empty service id.
    #[instrument(skip(self, actor), fields(system = %self.name()))]
    pub fn register_service(&self, service_id: &str, actor: impl ElasticActor) -> Result<ActorRef, ElasticError> {
        let service_ref = self.inner.context.service_ref(service_id)?;
        self.inner.node.insert_actor(service_ref.clone(), Box::new(actor));
        debug!(service = %service_ref, "registered service");
        Ok(service_ref)
    }

    /// Creates persistent actor `actor_id` of `actor_type` on the shard that owns it.
    ///
    /// Creation is asynchronous and idempotent; the returned ref is usable at once
    /// because envelopes to the shard are handled in order.
    ///
    /// # Errors
    ///
    /// * [`ElasticError::IllegalState`] when `actor_type` is not registered.
    /// * [`ElasticError::Delivery`] when the owning shard is not owned by this node.
    #[instrument(skip(self, initial_state), fields(system = %self.name()))]
    pub fn actor_of(
        &self,
        actor_id: &str,
        actor_type: &str,
        initial_state: Option<Vec<u8>>,
    ) -> Result<ActorRef, ElasticError> {
        self.ensure_actor_type(actor_type)?;
        let actor_ref = self.inner.context.shard_ref(actor_id)?;
        self.send_create(&actor_ref, actor_id, actor_type, initial_state)?;
        Ok(actor_ref)
    }

    /// Creates a temp actor on this node under a generated id.
    ///
    /// # Errors
    ///
    /// [`ElasticError::IllegalState`] when `actor_type` is not registered.
    pub fn temp_actor_of(&self, actor_type: &str, initial_state: Option<Vec<u8>>) -> Result<ActorRef, ElasticError> {
        self.ensure_actor_type(actor_type)?;
        let actor_id = Uuid::new_v4().to_string();
        let actor_ref = self.inner.context.node_ref(Some(&actor_id))?;
        self.send_create(&actor_ref, &actor_id, actor_type, initial_state)?;
        Ok(actor_ref)
    }

    /// Ref to persistent actor `actor_id`, without creating it.
    ///
    /// # Errors
    ///
    /// [`ElasticError::Addressing`] for an empty id.
    pub fn actor_for(&self, actor_id: &str) -> Result<ActorRef, ElasticError> {
        self.inner.context.shard_ref(actor_id)
    }

    /// Ref to service `service_id` on this node.
    ///
    /// # Errors
    ///
    /// [`ElasticError::Addressing`] for an empty id.
    pub fn service_actor_for(&self, service_id: &str) -> Result<ActorRef, ElasticError> {
        self.inner.context.service_ref(service_id)
    }

    /// Ref to this system's node itself.
    ///
    /// # Errors
    ///
    /// Never fails for a running system; kept fallible like the other ref builders.
    pub fn node_ref(&self) -> Result<ActorRef, ElasticError> {
        self.inner.context.node_ref(None)
    }

    /// Activates persistent actor `actor_id`, instantiating it if it is not hosted yet.
    ///
    /// # Errors
    ///
    /// Same as [`ActorSystem::actor_of`].
    pub fn activate(&self, actor_id: &str, actor_type: &str) -> Result<ActorRef, ElasticError> {
        self.ensure_actor_type(actor_type)?;
        let actor_ref = self.inner.context.shard_ref(actor_id)?;
        let activate = ActivateActor {
            actor_system: self.name().to_owned(),
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.to_owned(),
        };
        actor_ref.try_tell_payload(MessagePayload::from_message(&activate)?, None)?;
        Ok(actor_ref)
    }

    /// Destroys the actor behind `actor`.
    ///
    /// # Errors
    ///
    /// Delivery errors for the control message.
    pub fn stop(&self, actor: &ActorRef) -> Result<(), ElasticError> {
        let destroy = DestroyActor {
            actor_ref: actor.clone(),
        };
        actor.try_tell_payload(destroy.to_payload()?, None)
    }

    /// Shard that owns `actor_id`.
    pub fn shard_for(&self, actor_id: &str) -> ShardKey {
        self.inner.context.shard_key_for(actor_id)
    }

    pub fn shard(&self, shard_id: u32) -> Option<&Arc<ActorShard>> {
        usize::try_from(shard_id).ok().and_then(|i| self.inner.shards.get(i))
    }

    pub fn shards(&self) -> &[Arc<ActorShard>] {
        &self.inner.shards
    }

    pub fn node(&self) -> &Arc<ActorNode> {
        &self.inner.node
    }

    /// Routes an envelope addressed to this system to the container hosting its receiver.
    pub(crate) fn deliver(&self, message: InternalMessage) -> Result<(), ElasticError> {
        match message.receiver().path() {
            ActorPath::Shard { shard, .. } => self
                .shard(shard.shard_id())
                .ok_or_else(|| ElasticError::Addressing(format!("{} has no shard {}", self.name(), shard.shard_id())))?
                .deliver(message),
            ActorPath::Node { node, .. } | ActorPath::Service { node, .. } => {
                if node.node_id() != self.inner.context.node_id {
                    return Err(ElasticError::Delivery(format!("node {node} is not hosted here")));
                }
                self.inner.node.deliver(message)
            }
        }
    }

    /// Hosts a reply actor for one ask and returns its temp ref.
    pub(crate) fn spawn_reply_actor(&self, reply: ReplySender) -> Result<ActorRef, ElasticError> {
        let actor_id = Uuid::new_v4().to_string();
        let temp_ref = self.inner.context.node_ref(Some(&actor_id))?;
        self.inner
            .node
            .insert_actor(temp_ref.clone(), Box::new(ReplyActor::new(reply)));
        Ok(temp_ref)
    }

    fn ensure_actor_type(&self, actor_type: &str) -> Result<(), ElasticError> {
        if self.is_actor_type_registered(actor_type) {
            Ok(())
        } else {
            Err(ElasticError::IllegalState(format!(
                "unknown actor type {actor_type} in actor system {}",
                self.name()
            )))
        }
    }

    fn send_create(
        &self,
        actor_ref: &ActorRef,
        actor_id: &str,
        actor_type: &str,
        initial_state: Option<Vec<u8>>,
    ) -> Result<(), ElasticError> {
        let create = CreateActor {
            actor_system: self.name().to_owned(),
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.to_owned(),
            initial_state,
        };
        actor_ref.try_tell_payload(MessagePayload::from_message(&create)?, None)
    }
}
