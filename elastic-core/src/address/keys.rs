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

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one shard of an actor system.
///
/// A shard is the unit of ownership transfer during rebalancing; all persisted
/// scheduling and event state is partitioned by this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardKey {
    actor_system: String,
    shard_id: u32,
}

impl ShardKey {
    /// Creates a key for shard `shard_id` of `actor_system`.
    pub fn new(actor_system: impl Into<String>, shard_id: u32) -> Self {
        Self {
            actor_system: actor_system.into(),
            shard_id,
        }
    }

    #[inline]
    #[must_use]
    pub fn actor_system(&self) -> &str {
        &self.actor_system
    }

    #[inline]
    #[must_use]
    pub const fn shard_id(&self) -> u32 {
        self.shard_id
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/shards/{}", self.actor_system, self.shard_id)
    }
}

/// Identifies the node-local container of an actor system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    actor_system: String,
    node_id: String,
}

impl NodeKey {
    pub fn new(actor_system: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            actor_system: actor_system.into(),
            node_id: node_id.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn actor_system(&self) -> &str {
        &self.actor_system
    }

    #[inline]
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/nodes/{}", self.actor_system, self.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_display_as_spec_fragments() {
        assert_eq!(ShardKey::new("orders", 7).to_string(), "orders/shards/7");
        assert_eq!(NodeKey::new("orders", "node-a").to_string(), "orders/nodes/node-a");
    }

    #[test]
    fn shard_keys_order_by_system_then_id() {
        let mut keys = vec![ShardKey::new("b", 0), ShardKey::new("a", 2), ShardKey::new("a", 1)];
        keys.sort();
        assert_eq!(keys, vec![ShardKey::new("a", 1), ShardKey::new("a", 2), ShardKey::new("b", 0)]);
    }
}
