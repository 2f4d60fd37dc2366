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

use crate::common::ElasticError;
use crate::traits::Message;

/// A serialized message body together with its wire tag.
///
/// This is what envelopes, scheduled rows and listener rows carry; it can be
/// delivered without the sending side knowing the concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    type_name: String,
    bytes: Bytes,
    durable: bool,
}

impl MessagePayload {
    pub fn new(type_name: impl Into<String>, bytes: impl Into<Bytes>, durable: bool) -> Self {
        Self {
            type_name: type_name.into(),
            bytes: bytes.into(),
            durable,
        }
    }

    /// Serializes `message` with its own codec.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when the body cannot be encoded.
    pub fn from_message<M: Message>(message: &M) -> Result<Self, ElasticError> {
        Ok(Self::new(M::TYPE_NAME, message.encode()?, M::DURABLE))
    }

    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        self.durable
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Bytes, bool) {
        (self.type_name, self.bytes, self.durable)
    }
}
