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

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use elastic_core::message::MessagePayload;

/// Lifecycle events a shard can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorSystemEvent {
    /// The shard was registered on this node and its scheduled messages loaded.
    ActorShardInitialized,
    /// The shard is about to be released by this node.
    ActorShardReleased,
}

impl fmt::Display for ActorSystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorShardInitialized => f.write_str("ACTOR_SHARD_INITIALIZED"),
            Self::ActorShardReleased => f.write_str("ACTOR_SHARD_RELEASED"),
        }
    }
}

/// A durable subscription: deliver the stored message to `actor_id` when `event`
/// fires on the actor's shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorSystemEventListener {
    actor_id: String,
    event: ActorSystemEvent,
    message_type: String,
    message_bytes: Bytes,
}

impl ActorSystemEventListener {
    pub fn new(actor_id: impl Into<String>, event: ActorSystemEvent, payload: MessagePayload) -> Self {
        let (message_type, message_bytes, _) = payload.into_parts();
        Self {
            actor_id: actor_id.into(),
            event,
            message_type,
            message_bytes,
        }
    }

    #[inline]
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    #[inline]
    pub const fn event(&self) -> ActorSystemEvent {
        self.event
    }

    #[inline]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    #[inline]
    pub const fn message_bytes(&self) -> &Bytes {
        &self.message_bytes
    }
}
