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

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use elastic_core::address::ShardKey;
use elastic_core::common::ElasticError;

use crate::events::{ActorSystemEvent, ActorSystemEventListener};

/// Durable storage for lifecycle listeners, keyed by shard and event.
#[async_trait]
pub trait ActorSystemEventListenerRepository: Send + Sync {
    /// Stores `listener`, replacing any previous subscription of the same actor to
    /// the same event.
    async fn create(
        &self,
        shard: &ShardKey,
        event: ActorSystemEvent,
        listener: &ActorSystemEventListener,
    ) -> Result<(), ElasticError>;

    /// Removes the subscription of `actor_id`, if any.
    async fn delete(&self, shard: &ShardKey, event: ActorSystemEvent, actor_id: &str) -> Result<(), ElasticError>;

    async fn get_all(
        &self,
        shard: &ShardKey,
        event: ActorSystemEvent,
    ) -> Result<Vec<ActorSystemEventListener>, ElasticError>;
}

type ListenerTable = HashMap<(ShardKey, ActorSystemEvent), BTreeMap<String, ActorSystemEventListener>>;

/// An [`ActorSystemEventListenerRepository`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEventListenerRepository {
    listeners: RwLock<ListenerTable>,
}

impl InMemoryEventListenerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners stored for (`shard`, `event`).
    pub fn len(&self, shard: &ShardKey, event: ActorSystemEvent) -> usize {
        self.listeners
            .read()
            .get(&(shard.clone(), event))
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, shard: &ShardKey, event: ActorSystemEvent) -> bool {
        self.len(shard, event) == 0
    }
}

#[async_trait]
impl ActorSystemEventListenerRepository for InMemoryEventListenerRepository {
    async fn create(
        &self,
        shard: &ShardKey,
        event: ActorSystemEvent,
        listener: &ActorSystemEventListener,
    ) -> Result<(), ElasticError> {
        self.listeners
            .write()
            .entry((shard.clone(), event))
            .or_default()
            .insert(listener.actor_id().to_string(), listener.clone());
        Ok(())
    }

    async fn delete(&self, shard: &ShardKey, event: ActorSystemEvent, actor_id: &str) -> Result<(), ElasticError> {
        let mut listeners = self.listeners.write();
        let key = (shard.clone(), event);
        if let Some(by_actor) = listeners.get_mut(&key) {
            by_actor.remove(actor_id);
            if by_actor.is_empty() {
                listeners.remove(&key);
            }
        }
        Ok(())
    }

    async fn get_all(
        &self,
        shard: &ShardKey,
        event: ActorSystemEvent,
    ) -> Result<Vec<ActorSystemEventListener>, ElasticError> {
        Ok(self
            .listeners
            .read()
            .get(&(shard.clone(), event))
            .map(|by_actor| by_actor.values().cloned().collect())
            .unwrap_or_default())
    }
}
