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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use elastic_core::address::ActorRef;
use elastic_core::message::MessagePayload;

/// Identifies a scheduled message within its shard.
///
/// Orders by fire time, then id, which is the order the repository pages in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduledMessageKey {
    fire_time: DateTime<Utc>,
    id: Uuid,
}

impl ScheduledMessageKey {
    pub const fn new(id: Uuid, fire_time: DateTime<Utc>) -> Self {
        Self { fire_time, id }
    }

    /// The largest key firing at `fire_time`; paging after it skips that instant.
    pub const fn last_at(fire_time: DateTime<Utc>) -> Self {
        Self {
            fire_time,
            id: Uuid::from_u128(u128::MAX),
        }
    }

    #[inline]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub const fn fire_time(&self) -> DateTime<Utc> {
        self.fire_time
    }
}

/// A message persisted for delivery at `fire_time`.
///
/// Receivers may see the same message twice if the node stops between delivery
/// and deletion of the row; [`ScheduledMessage::id`] is stable across redeliveries.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledMessage {
    key: ScheduledMessageKey,
    sender: ActorRef,
    receiver: ActorRef,
    payload: MessagePayload,
}

impl ScheduledMessage {
    pub fn new(sender: ActorRef, receiver: ActorRef, payload: MessagePayload, fire_time: DateTime<Utc>) -> Self {
        Self {
            key: ScheduledMessageKey::new(Uuid::new_v4(), fire_time),
            sender,
            receiver,
            payload,
        }
    }

    pub const fn from_parts(key: ScheduledMessageKey, sender: ActorRef, receiver: ActorRef, payload: MessagePayload) -> Self {
        Self {
            key,
            sender,
            receiver,
            payload,
        }
    }

    #[inline]
    pub const fn key(&self) -> &ScheduledMessageKey {
        &self.key
    }

    #[inline]
    pub const fn id(&self) -> Uuid {
        self.key.id
    }

    #[inline]
    pub const fn fire_time(&self) -> DateTime<Utc> {
        self.key.fire_time
    }

    #[inline]
    pub const fn sender(&self) -> &ActorRef {
        &self.sender
    }

    #[inline]
    pub const fn receiver(&self) -> &ActorRef {
        &self.receiver
    }

    #[inline]
    pub const fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    /// The declared message type tag.
    #[inline]
    pub fn message_type(&self) -> &str {
        self.payload.type_name()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn keys_order_by_fire_time_first() {
        let now = Utc::now();
        let early = ScheduledMessageKey::new(Uuid::from_u128(9), now);
        let late = ScheduledMessageKey::new(Uuid::from_u128(1), now + Duration::seconds(1));
        assert!(early < late);
        assert!(early < ScheduledMessageKey::last_at(now));
        assert!(ScheduledMessageKey::last_at(now) < late);
    }
}
