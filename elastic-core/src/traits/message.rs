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

use std::any::Any;
use std::fmt::Debug;

use dyn_clone::DynClone;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::ElasticError;
use crate::message::MessagePayload;

/// A message that can be carried by an envelope.
///
/// Usually implemented through `#[elastic_message]`. `TYPE_NAME` is the wire tag stored
/// in envelopes, scheduled rows and listener rows, and must stay stable once data has
/// been persisted.
pub trait Message: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Stable type tag.
    const TYPE_NAME: &'static str;

    /// Whether envelopes carrying this message are marked durable.
    const DURABLE: bool = true;

    /// Serializes the message body.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when the body cannot be encoded.
    fn encode(&self) -> Result<Vec<u8>, ElasticError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes a body produced by [`Message::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when the bytes are not a valid body.
    fn decode(bytes: &[u8]) -> Result<Self, ElasticError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Object-safe view of a [`Message`], as handed to actors after decoding.
pub trait AnyMessage: DynClone + Any + Send + Sync + Debug {
    /// Returns a reference to the message as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The message's wire tag.
    fn type_name(&self) -> &'static str;

    fn is_durable(&self) -> bool;

    /// Serializes the message into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when the body cannot be encoded.
    fn to_payload(&self) -> Result<MessagePayload, ElasticError>;
}

dyn_clone::clone_trait_object!(AnyMessage);

impl<T: Message> AnyMessage for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn is_durable(&self) -> bool {
        T::DURABLE
    }

    fn to_payload(&self) -> Result<MessagePayload, ElasticError> {
        MessagePayload::from_message(self)
    }
}

impl dyn AnyMessage {
    /// Attempts to view the message as a concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }
}
