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

//! Static registry of control-message deserializers.

use std::collections::HashMap;
use std::fmt::Debug;

use lazy_static::lazy_static;

use crate::common::ElasticError;
use crate::message::control::{
    ActivateActor, CancelScheduledMessage, ControlMessage, CreateActor, DestroyActor,
};
use crate::traits::{ActorRefFactory, Message};

/// Decodes one control-message type.
///
/// Implementations are stateless and shared by every delivery task.
pub trait ControlMessageDeserializer: Debug + Send + Sync {
    /// The type tag this deserializer handles.
    fn type_name(&self) -> &'static str;

    /// Decodes a control message body.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] for malformed bodies and
    /// [`ElasticError::Addressing`] for unparsable embedded refs.
    fn deserialize(&self, bytes: &[u8], refs: &dyn ActorRefFactory) -> Result<ControlMessage, ElasticError>;
}

#[derive(Debug)]
struct CreateActorDeserializer;

impl ControlMessageDeserializer for CreateActorDeserializer {
    fn type_name(&self) -> &'static str {
        CreateActor::TYPE_NAME
    }

    fn deserialize(&self, bytes: &[u8], _refs: &dyn ActorRefFactory) -> Result<ControlMessage, ElasticError> {
        CreateActor::decode(bytes).map(ControlMessage::CreateActor)
    }
}

#[derive(Debug)]
struct DestroyActorDeserializer;

impl ControlMessageDeserializer for DestroyActorDeserializer {
    fn type_name(&self) -> &'static str {
        DestroyActor::TYPE_NAME
    }

    fn deserialize(&self, bytes: &[u8], refs: &dyn ActorRefFactory) -> Result<ControlMessage, ElasticError> {
        DestroyActor::from_bytes(bytes, refs).map(ControlMessage::DestroyActor)
    }
}

#[derive(Debug)]
struct ActivateActorDeserializer;

impl ControlMessageDeserializer for ActivateActorDeserializer {
    fn type_name(&self) -> &'static str {
        ActivateActor::TYPE_NAME
    }

    fn deserialize(&self, bytes: &[u8], _refs: &dyn ActorRefFactory) -> Result<ControlMessage, ElasticError> {
        ActivateActor::decode(bytes).map(ControlMessage::ActivateActor)
    }
}

#[derive(Debug)]
struct CancelScheduledMessageDeserializer;

impl ControlMessageDeserializer for CancelScheduledMessageDeserializer {
    fn type_name(&self) -> &'static str {
        CancelScheduledMessage::TYPE_NAME
    }

    fn deserialize(&self, bytes: &[u8], _refs: &dyn ActorRefFactory) -> Result<ControlMessage, ElasticError> {
        CancelScheduledMessage::decode(bytes).map(ControlMessage::CancelScheduledMessage)
    }
}

lazy_static! {
    static ref CONTROL_MESSAGES: ControlMessageRegistry = ControlMessageRegistry::build();
}

/// Maps control-message type tags to their deserializers.
///
/// Built once per process and never mutated. A failed lookup means the payload is
/// an application message and should go through the application codecs instead.
#[derive(Debug)]
pub struct ControlMessageRegistry {
    deserializers: HashMap<&'static str, Box<dyn ControlMessageDeserializer>>,
}

impl ControlMessageRegistry {
    fn build() -> Self {
        let all: [Box<dyn ControlMessageDeserializer>; 4] = [
            Box::new(CreateActorDeserializer),
            Box::new(DestroyActorDeserializer),
            Box::new(ActivateActorDeserializer),
            Box::new(CancelScheduledMessageDeserializer),
        ];
        Self {
            deserializers: all.into_iter().map(|d| (d.type_name(), d)).collect(),
        }
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &CONTROL_MESSAGES
    }

    #[must_use]
    pub fn lookup(&self, type_name: &str) -> Option<&dyn ControlMessageDeserializer> {
        self.deserializers.get(type_name).map(|d| &**d)
    }

    #[must_use]
    pub fn is_control_message(&self, type_name: &str) -> bool {
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
}
