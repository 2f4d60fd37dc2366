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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use elastic_core::address::{ActorRef, ShardKey};
use elastic_core::common::ElasticError;
use elastic_core::message::{InternalMessage, MessagePayload};

use crate::actor::container::{ActorContainer, Locality};
use crate::actor::SystemContext;

/// One shard of an actor system on this node.
///
/// A shard accepts envelopes only while this node owns it.
pub struct ActorShard {
    key: ShardKey,
    container: ActorContainer,
    owned: AtomicBool,
}

impl std::fmt::Debug for ActorShard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorShard")
            .field("key", &self.key)
            .field("owned", &self.is_owned())
            .field("actors", &self.container.len())
            .finish()
    }
}

impl ActorShard {
    pub(crate) fn new(key: ShardKey, system: Arc<SystemContext>, cancel: CancellationToken) -> Self {
        let container = ActorContainer::spawn(Locality::Shard(key.clone()), system, cancel);
        Self {
            key,
            container,
            owned: AtomicBool::new(false),
        }
    }

    #[inline]
    pub const fn key(&self) -> &ShardKey {
        &self.key
    }

    pub fn is_owned(&self) -> bool {
        self.owned.load(Ordering::Acquire)
    }

    pub(crate) fn set_owned(&self, owned: bool) {
        self.owned.store(owned, Ordering::Release);
    }

    /// Ref to `actor_id` on this shard.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] for an empty id.
    pub fn actor_ref(&self, actor_id: &str) -> Result<ActorRef, ElasticError> {
        self.container.system().shard_ref_on(self.key.clone(), actor_id)
    }

    /// Hands `payload` to `receiver`, which must live on this shard.
    ///
    /// # Errors
    ///
    /// * [`ElasticError::Addressing`] when `receiver` is on another shard.
    /// * [`ElasticError::Delivery`] when the shard is not owned by this node.
    pub fn send_message(
        &self,
        sender: Option<&ActorRef>,
        receiver: &ActorRef,
        payload: MessagePayload,
    ) -> Result<(), ElasticError> {
        if receiver.shard_key() != Some(&self.key) {
            return Err(ElasticError::Addressing(format!("{receiver} is not on shard {}", self.key)));
        }
        self.deliver(InternalMessage::new(sender.cloned(), receiver.clone(), payload))
    }

    pub(crate) fn deliver(&self, message: InternalMessage) -> Result<(), ElasticError> {
        if !self.is_owned() {
            return Err(ElasticError::Delivery(format!("shard {} is not owned by this node", self.key)));
        }
        self.container.enqueue(message)
    }

    pub fn contains_actor(&self, actor_id: &str) -> bool {
        self.container.contains(actor_id)
    }

    pub fn actor_count(&self) -> usize {
        self.container.len()
    }
}
