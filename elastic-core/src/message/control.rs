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

//! The closed set of control messages.
//!
//! Control messages travel through the normal addressing path but are intercepted by
//! the receiving container, which applies exactly one structural effect per message
//! instead of handing it to an actor.

use chrono::{DateTime, Utc};
use elastic_macro::elastic_message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::ActorRef;
use crate::common::ElasticError;
use crate::message::MessagePayload;
use crate::traits::{ActorRefFactory, Message};

/// Instantiates `actor_id` of type `actor_type`, optionally from `initial_state`.
#[elastic_message(name = "elastic.CreateActor")]
#[derive(PartialEq, Eq)]
pub struct CreateActor {
    pub actor_system: String,
    pub actor_type: String,
    pub actor_id: String,
    pub initial_state: Option<Vec<u8>>,
}

/// Removes the actor addressed by `actor_ref`.
///
/// Carries a live ref, so it is not a plain serde message: the ref is written as its
/// spec and resolved through an [`ActorRefFactory`] when decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyActor {
    pub actor_ref: ActorRef,
}

#[derive(Serialize, Deserialize)]
struct DestroyActorBody {
    actor_ref: String,
}

impl DestroyActor {
    pub const TYPE_NAME: &'static str = "elastic.DestroyActor";

    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when the body cannot be encoded.
    pub fn to_payload(&self) -> Result<MessagePayload, ElasticError> {
        let body = DestroyActorBody {
            actor_ref: self.actor_ref.spec().to_string(),
        };
        Ok(MessagePayload::new(Self::TYPE_NAME, serde_json::to_vec(&body)?, true))
    }

    /// # Errors
    ///
    /// Fails on malformed bodies and unparsable specs.
    pub fn from_bytes(bytes: &[u8], refs: &dyn ActorRefFactory) -> Result<Self, ElasticError> {
        let body: DestroyActorBody = serde_json::from_slice(bytes)?;
        Ok(Self {
            actor_ref: refs.create(&body.actor_ref)?,
        })
    }
}

/// Marks `actor_id` live, instantiating it first if needed.
#[elastic_message(name = "elastic.ActivateActor")]
#[derive(PartialEq, Eq)]
pub struct ActivateActor {
    pub actor_system: String,
    pub actor_type: String,
    pub actor_id: String,
}

/// Cancels the scheduled message identified by `message_id` and `fire_time` on the
/// shard that receives it.
#[elastic_message(name = "elastic.CancelScheduledMessage")]
#[derive(PartialEq, Eq)]
pub struct CancelScheduledMessage {
    pub message_id: Uuid,
    pub fire_time: DateTime<Utc>,
}

/// A decoded control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    CreateActor(CreateActor),
    DestroyActor(DestroyActor),
    ActivateActor(ActivateActor),
    CancelScheduledMessage(CancelScheduledMessage),
}

impl ControlMessage {
    /// Type tags of every control message.
    pub const TYPE_NAMES: [&'static str; 4] = [
        CreateActor::TYPE_NAME,
        DestroyActor::TYPE_NAME,
        ActivateActor::TYPE_NAME,
        CancelScheduledMessage::TYPE_NAME,
    ];

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::CreateActor(_) => CreateActor::TYPE_NAME,
            Self::DestroyActor(_) => DestroyActor::TYPE_NAME,
            Self::ActivateActor(_) => ActivateActor::TYPE_NAME,
            Self::CancelScheduledMessage(_) => CancelScheduledMessage::TYPE_NAME,
        }
    }

    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when the body cannot be encoded.
    pub fn to_payload(&self) -> Result<MessagePayload, ElasticError> {
        match self {
            Self::CreateActor(m) => MessagePayload::from_message(m),
            Self::DestroyActor(m) => m.to_payload(),
            Self::ActivateActor(m) => MessagePayload::from_message(m),
            Self::CancelScheduledMessage(m) => MessagePayload::from_message(m),
        }
    }
}

impl From<CreateActor> for ControlMessage {
    fn from(message: CreateActor) -> Self {
        Self::CreateActor(message)
    }
}

impl From<DestroyActor> for ControlMessage {
    fn from(message: DestroyActor) -> Self {
        Self::DestroyActor(message)
    }
}

impl From<ActivateActor> for ControlMessage {
    fn from(message: ActivateActor) -> Self {
        Self::ActivateActor(message)
    }
}

impl From<CancelScheduledMessage> for ControlMessage {
    fn from(message: CancelScheduledMessage) -> Self {
        Self::CancelScheduledMessage(message)
    }
}
