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
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use elastic_core::address::ShardKey;
use elastic_core::common::ElasticError;

use crate::scheduler::{ScheduledMessage, ScheduledMessageKey};

/// Durable storage for scheduled messages, partitioned by shard.
///
/// The repository is the authoritative copy; in-memory timers are rebuilt from it
/// whenever a shard is registered.
#[async_trait]
pub trait ScheduledMessageRepository: Send + Sync {
    async fn create(&self, shard: &ShardKey, message: &ScheduledMessage) -> Result<(), ElasticError>;

    async fn get_all(&self, shard: &ShardKey) -> Result<Vec<ScheduledMessage>, ElasticError>;

    /// Deleting a missing row is not an error.
    async fn delete(&self, shard: &ShardKey, key: &ScheduledMessageKey) -> Result<(), ElasticError>;

    /// Returns up to `limit` messages ordered by key, strictly after `after` and due
    /// no later than `until`.
    ///
    /// The default filters [`get_all`](Self::get_all); stores with an ordered index
    /// should override it.
    async fn get_window(
        &self,
        shard: &ShardKey,
        after: Option<&ScheduledMessageKey>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledMessage>, ElasticError> {
        let mut all = self.get_all(shard).await?;
        all.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(all
            .into_iter()
            .filter(|m| after.map_or(true, |after| m.key() > after))
            .take_while(|m| m.fire_time() <= until)
            .take(limit)
            .collect())
    }
}

/// A [`ScheduledMessageRepository`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryScheduledMessageRepository {
    rows: RwLock<HashMap<ShardKey, BTreeMap<ScheduledMessageKey, ScheduledMessage>>>,
}

impl InMemoryScheduledMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored for `shard`.
    pub fn len(&self, shard: &ShardKey) -> usize {
        self.rows.read().get(shard).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, shard: &ShardKey) -> bool {
        self.len(shard) == 0
    }

    pub fn contains(&self, shard: &ShardKey, key: &ScheduledMessageKey) -> bool {
        self.rows.read().get(shard).is_some_and(|rows| rows.contains_key(key))
    }

    pub fn get(&self, shard: &ShardKey, key: &ScheduledMessageKey) -> Option<ScheduledMessage> {
        self.rows.read().get(shard).and_then(|rows| rows.get(key).cloned())
    }
}

#[async_trait]
impl ScheduledMessageRepository for InMemoryScheduledMessageRepository {
    async fn create(&self, shard: &ShardKey, message: &ScheduledMessage) -> Result<(), ElasticError> {
        self.rows
            .write()
            .entry(shard.clone())
            .or_default()
            .insert(message.key().clone(), message.clone());
        Ok(())
    }

    async fn get_all(&self, shard: &ShardKey) -> Result<Vec<ScheduledMessage>, ElasticError> {
        Ok(self
            .rows
            .read()
            .get(shard)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, shard: &ShardKey, key: &ScheduledMessageKey) -> Result<(), ElasticError> {
        let mut rows = self.rows.write();
        if let Some(shard_rows) = rows.get_mut(shard) {
            shard_rows.remove(key);
            if shard_rows.is_empty() {
                rows.remove(shard);
            }
        }
        Ok(())
    }

    async fn get_window(
        &self,
        shard: &ShardKey,
        after: Option<&ScheduledMessageKey>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledMessage>, ElasticError> {
        let rows = self.rows.read();
        let Some(shard_rows) = rows.get(shard) else {
            return Ok(Vec::new());
        };
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(shard_rows
            .range((lower, Bound::Unbounded))
            .map(|(_, message)| message)
            .take_while(|message| message.fire_time() <= until)
            .take(limit)
            .cloned()
            .collect())
    }
}
