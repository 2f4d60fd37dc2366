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

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use elastic_core::address::ShardKey;
use elastic_core::common::ElasticError;
use elastic_core::message::CancelScheduledMessage;

use crate::scheduler::ScheduledMessageKey;

/// Scheme prefix of scheduled-message ref specs.
pub const MESSAGE_SCHEME: &str = "message://";

/// Handle to a scheduled message, returned by `schedule_once`.
///
/// Formats as `message://{cluster}/{system}/shards/{shardId}/{fireTimeMillis}/{id}` and
/// parses back from that form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduledMessageRef {
    cluster: String,
    shard: ShardKey,
    key: ScheduledMessageKey,
}

impl ScheduledMessageRef {
    pub fn new(cluster: impl Into<String>, shard: ShardKey, key: ScheduledMessageKey) -> Self {
        Self {
            cluster: cluster.into(),
            shard,
            key,
        }
    }

    #[inline]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    #[inline]
    pub const fn shard(&self) -> &ShardKey {
        &self.shard
    }

    #[inline]
    pub const fn key(&self) -> &ScheduledMessageKey {
        &self.key
    }

    /// The control message that cancels this schedule when sent to any actor on
    /// its shard.
    pub const fn cancel_message(&self) -> CancelScheduledMessage {
        CancelScheduledMessage {
            message_id: self.key.id(),
            fire_time: self.key.fire_time(),
        }
    }

    /// Parses a `message://` spec.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] for anything but the documented form.
    pub fn parse(spec: &str) -> Result<Self, ElasticError> {
        let malformed = || ElasticError::Addressing(format!("invalid scheduled message spec '{spec}'"));
        let rest = spec.strip_prefix(MESSAGE_SCHEME).ok_or_else(malformed)?;

        let parts: Vec<&str> = rest.split('/').collect();
        let [cluster, system, "shards", shard_id, millis, id] = parts.as_slice() else {
            return Err(malformed());
        };
        if cluster.is_empty() || system.is_empty() {
            return Err(malformed());
        }
        let shard_id = shard_id.parse::<u32>().map_err(|_| malformed())?;
        let millis = millis.parse::<i64>().map_err(|_| malformed())?;
        let fire_time = Utc.timestamp_millis_opt(millis).single().ok_or_else(malformed)?;
        let id = Uuid::parse_str(id).map_err(|_| malformed())?;

        Ok(Self::new(
            *cluster,
            ShardKey::new(*system, shard_id),
            ScheduledMessageKey::new(id, fire_time),
        ))
    }
}

impl fmt::Display for ScheduledMessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{MESSAGE_SCHEME}{}/{}/{}/{}",
            self.cluster,
            self.shard,
            self.key.fire_time().timestamp_millis(),
            self.key.id()
        )
    }
}
