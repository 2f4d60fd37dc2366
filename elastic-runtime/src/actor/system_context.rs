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

use dashmap::DashMap;
use tokio_util::task::TaskTracker;

use elastic_core::address::{ActorRef, ActorRefParser, NodeKey, ShardKey};
use elastic_core::common::ElasticError;
use elastic_core::message::MessageCodecs;
use elastic_core::traits::MessageRouter;

use crate::actor::{ActorFactory, ElasticActor};
use crate::common::ClusterRouter;
use crate::events::ActorSystemEventRegistry;
use crate::scheduler::ShardedScheduler;

/// Shard that owns `actor_id` among `shards` shards.
#[inline]
pub fn shard_for(actor_id: &str, shards: u32) -> u32 {
    crc32fast::hash(actor_id.as_bytes()) % shards.max(1)
}

/// State shared by every container, mailbox and handler context of one actor system.
pub(crate) struct SystemContext {
    pub(crate) name: String,
    pub(crate) cluster_name: String,
    pub(crate) node_id: String,
    pub(crate) shard_count: u32,
    pub(crate) actor_types: DashMap<String, ActorFactory>,
    pub(crate) codecs: MessageCodecs,
    pub(crate) scheduler: ShardedScheduler,
    pub(crate) events: Arc<ActorSystemEventRegistry>,
    pub(crate) router: Weak<ClusterRouter>,
    pub(crate) tracker: TaskTracker,
}

impl SystemContext {
    pub(crate) fn router_handle(&self) -> Weak<dyn MessageRouter> {
        self.router.clone()
    }

    pub(crate) fn refs(&self) -> ActorRefParser {
        ActorRefParser::new(self.cluster_name.clone(), self.router_handle())
    }

    pub(crate) fn node_key(&self) -> NodeKey {
        NodeKey::new(self.name.clone(), self.node_id.clone())
    }

    pub(crate) fn shard_key_for(&self, actor_id: &str) -> ShardKey {
        ShardKey::new(self.name.clone(), shard_for(actor_id, self.shard_count))
    }

    pub(crate) fn shard_ref(&self, actor_id: &str) -> Result<ActorRef, ElasticError> {
        self.shard_ref_on(self.shard_key_for(actor_id), actor_id)
    }

    pub(crate) fn shard_ref_on(&self, shard: ShardKey, actor_id: &str) -> Result<ActorRef, ElasticError> {
        ActorRef::shard(&self.cluster_name, shard, actor_id, Some(self.router_handle()))
    }

    pub(crate) fn node_ref(&self, actor_id: Option<&str>) -> Result<ActorRef, ElasticError> {
        ActorRef::node(
            &self.cluster_name,
            self.node_key(),
            actor_id.map(str::to_owned),
            Some(self.router_handle()),
        )
    }

    pub(crate) fn service_ref(&self, service_id: &str) -> Result<ActorRef, ElasticError> {
        ActorRef::service(&self.cluster_name, self.node_key(), service_id, Some(self.router_handle()))
    }

    pub(crate) fn instantiate(
        &self,
        actor_type: &str,
        actor_id: &str,
        initial_state: Option<&[u8]>,
    ) -> Result<Box<dyn ElasticActor>, ElasticError> {
        let factory = self
            .actor_types
            .get(actor_type)
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| ElasticError::IllegalState(format!("unknown actor type {actor_type}")))?;
        factory(actor_id, initial_state)
            .map_err(|e| ElasticError::IllegalState(format!("{actor_type} factory failed for {actor_id}: {e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::shard_for;

    #[test]
    fn partitioning_is_stable_and_bounded() {
        for id in ["a", "order-17", "users/42", ""] {
            let shard = shard_for(id, 8);
            assert!(shard < 8);
            assert_eq!(shard, shard_for(id, 8));
        }
        assert_eq!(shard_for("anything", 1), 0);
    }
}
