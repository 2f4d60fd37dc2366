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

pub use codec::InternalMessageCodec;
pub use control::{
    ActivateActor, CancelScheduledMessage, ControlMessage, CreateActor, DestroyActor,
};
pub use control_registry::{ControlMessageDeserializer, ControlMessageRegistry};
pub use internal_message::InternalMessage;
pub use message_codecs::{DeserializerFn, MessageCodecs};
pub use payload::MessagePayload;

pub mod codec;
mod control;
mod control_registry;
mod internal_message;
mod message_codecs;
mod payload;
