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

//! Registry of application message codecs.

use std::sync::Arc;

use dashmap::DashMap;

use crate::common::ElasticError;
use crate::traits::{AnyMessage, Message};

/// Deserializer stored in the registry.
///
/// Takes a serialized body and returns the decoded message as a trait object.
pub type DeserializerFn = Arc<dyn Fn(&[u8]) -> Result<Box<dyn AnyMessage>, ElasticError> + Send + Sync>;

/// Registry mapping message type tags to deserializers.
///
/// Envelopes only carry a type tag and opaque bytes. Before a payload can be handed
/// to an actor as a typed message, or a stored listener message can be replayed, its
/// type must be registered here.
///
/// # Thread Safety
///
/// Backed by [`DashMap`]; registration and lookups may run concurrently. Cloning
/// shares the underlying table.
///
/// # Example
///
/// ```rust,ignore
/// #[elastic_message]
/// struct PriceUpdate {
///     symbol: String,
///     price: f64,
/// }
///
/// let codecs = MessageCodecs::new();
/// codecs.register::<PriceUpdate>();
/// assert!(codecs.is_registered("PriceUpdate"));
/// ```
#[derive(Clone, Default)]
pub struct MessageCodecs {
    deserializers: Arc<DashMap<String, DeserializerFn>>,
}

impl std::fmt::Debug for MessageCodecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCodecs")
            .field("registered_types", &self.deserializers.len())
            .finish()
    }
}

impl MessageCodecs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `M` under its [`Message::TYPE_NAME`]. Re-registering replaces the
    /// previous entry.
    pub fn register<M: Message>(&self) {
        let deserializer: DeserializerFn = Arc::new(|bytes: &[u8]| {
            let message = M::decode(bytes)?;
            Ok(Box::new(message) as Box<dyn AnyMessage>)
        });
        self.deserializers.insert(M::TYPE_NAME.to_string(), deserializer);
    }

    /// Looks up the deserializer for `type_name`.
    #[must_use]
    pub fn deserializer(&self, type_name: &str) -> Option<DeserializerFn> {
        self.deserializers.get(type_name).map(|entry| Arc::clone(entry.value()))
    }

    /// Decodes `bytes` with the deserializer registered for `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when no codec is registered for the
    /// type or the bytes do not decode.
    pub fn deserialize(&self, type_name: &str, bytes: &[u8]) -> Result<Box<dyn AnyMessage>, ElasticError> {
        let deserializer = self
            .deserializer(type_name)
            .ok_or_else(|| ElasticError::Serialization(format!("no codec registered for message type {type_name}")))?;
        deserializer(bytes)
    }

    #[must_use]
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.deserializers.contains_key(type_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deserializers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deserializers.is_empty()
    }

    /// Returns all registered type tags.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        self.deserializers.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elastic_macro::elastic_message;

    #[elastic_message(name = "test.Quote")]
    struct Quote {
        symbol: String,
        price: u64,
    }

    #[test]
    fn registered_types_decode_to_their_concrete_type() {
        let codecs = MessageCodecs::new();
        codecs.register::<Quote>();

        let bytes = Quote {
            symbol: "ELA".into(),
            price: 42,
        }
        .encode()
        .unwrap();
        let decoded = codecs.deserialize("test.Quote", &bytes).unwrap();
        let quote = decoded.downcast_ref::<Quote>().unwrap();
        assert_eq!(quote.symbol, "ELA");
        assert_eq!(quote.price, 42);
        assert_eq!(decoded.type_name(), "test.Quote");
    }

    #[test]
    fn unknown_types_are_serialization_errors() {
        let codecs = MessageCodecs::new();
        assert!(codecs.deserializer("missing").is_none());
        assert!(matches!(
            codecs.deserialize("missing", b"{}"),
            Err(ElasticError::Serialization(_))
        ));
    }

    #[test]
    fn clones_share_registrations() {
        let codecs = MessageCodecs::new();
        let shared = codecs.clone();
        shared.register::<Quote>();
        assert!(codecs.is_registered("test.Quote"));
        assert_eq!(codecs.type_names(), vec!["test.Quote".to_string()]);
        assert_eq!(codecs.len(), 1);
    }
}
