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

use bytes::Bytes;
use static_assertions::assert_impl_all;
use uuid::Uuid;

use crate::address::ActorRef;
use crate::common::ElasticError;
use crate::message::MessagePayload;
use crate::traits::Message;

/// The envelope wrapping every message in flight.
///
/// The payload is an immutable [`Bytes`] buffer: encoding the envelope reads it
/// without consuming it, so the same envelope can be persisted and delivered
/// locally without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalMessage {
    id: Uuid,
    sender: Option<ActorRef>,
    receiver: ActorRef,
    payload: Bytes,
    payload_type_name: String,
    durable: bool,
    undeliverable: bool,
}

assert_impl_all!(InternalMessage: Send, Sync);

impl InternalMessage {
    /// Wraps `payload` in a fresh envelope with a random id.
    #[must_use]
    pub fn new(sender: Option<ActorRef>, receiver: ActorRef, payload: MessagePayload) -> Self {
        let (payload_type_name, payload, durable) = payload.into_parts();
        Self {
            id: Uuid::new_v4(),
            sender,
            receiver,
            payload,
            payload_type_name,
            durable,
            undeliverable: false,
        }
    }

    /// Rebuilds an envelope from decoded fields.
    #[must_use]
    pub fn from_parts(
        id: Uuid,
        sender: Option<ActorRef>,
        receiver: ActorRef,
        payload: Bytes,
        payload_type_name: String,
        durable: bool,
        undeliverable: bool,
    ) -> Self {
        Self {
            id,
            sender,
            receiver,
            payload,
            payload_type_name,
            durable,
            undeliverable,
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn receiver(&self) -> &ActorRef {
        &self.receiver
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[inline]
    #[must_use]
    pub fn payload_type_name(&self) -> &str {
        &self.payload_type_name
    }

    #[inline]
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        self.durable
    }

    #[inline]
    #[must_use]
    pub const fn is_undeliverable(&self) -> bool {
        self.undeliverable
    }

    /// The payload as a standalone [`MessagePayload`].
    #[must_use]
    pub fn to_payload(&self) -> MessagePayload {
        MessagePayload::new(self.payload_type_name.clone(), self.payload.clone(), self.durable)
    }

    /// Decodes the payload as `M`.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when the tag differs from `M::TYPE_NAME`
    /// or the body does not decode.
    pub fn decode_payload<M: Message>(&self) -> Result<M, ElasticError> {
        if self.payload_type_name != M::TYPE_NAME {
            return Err(ElasticError::Serialization(format!(
                "payload is {} not {}",
                self.payload_type_name,
                M::TYPE_NAME
            )));
        }
        M::decode(&self.payload)
    }

    /// The envelope returned to the sender when the receiver does not exist.
    ///
    /// Sender and receiver swap places and the undeliverable flag is set. Returns
    /// `None` for anonymous messages and for envelopes that already bounced.
    #[must_use]
    pub fn to_undeliverable(&self) -> Option<Self> {
        if self.undeliverable {
            return None;
        }
        let original_sender = self.sender.clone()?;
        Some(Self {
            id: Uuid::new_v4(),
            sender: Some(self.receiver.clone()),
            receiver: original_sender,
            payload: self.payload.clone(),
            payload_type_name: self.payload_type_name.clone(),
            durable: self.durable,
            undeliverable: true,
        })
    }
}
