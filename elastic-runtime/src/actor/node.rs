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

use elastic_core::address::{ActorRef, NodeKey};
use elastic_core::common::ElasticError;
use elastic_core::message::InternalMessage;

use crate::actor::container::{ActorContainer, Locality};
use crate::actor::{ElasticActor, SystemContext};

/// The node-local container of an actor system: temp actors and services.
pub struct ActorNode {
    key: NodeKey,
    container: ActorContainer,
}

impl std::fmt::Debug for ActorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorNode")
            .field("key", &self.key)
            .field("actors", &self.container.len())
            .finish()
    }
}

impl ActorNode {
    pub(crate) fn new(key: NodeKey, system: Arc<SystemContext>, cancel: CancellationToken) -> Self {
        let container = ActorContainer::spawn(Locality::Node(key.clone()), system, cancel);
        Self { key, container }
    }

    #[inline]
    pub const fn key(&self) -> &NodeKey {
        &self.key
    }

    pub(crate) fn deliver(&self, message: InternalMessage) -> Result<(), ElasticError> {
        self.container.enqueue(message)
    }

    pub(crate) fn insert_actor(&self, self_ref: ActorRef, actor: Box<dyn ElasticActor>) {
        self.container.insert_actor(self_ref, actor);
    }

    pub(crate) fn remove_actor(&self, self_ref: &ActorRef) -> bool {
        self.container.remove_actor(&self_ref.local_key())
    }

    /// Whether `actor` (a temp or service ref on this node) is hosted here.
    pub fn contains_actor(&self, actor: &ActorRef) -> bool {
        actor.node_key() == Some(&self.key) && self.container.contains(&actor.local_key())
    }

    pub fn actor_count(&self) -> usize {
        self.container.len()
    }
}
