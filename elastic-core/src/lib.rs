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

#![forbid(unsafe_code)]
//! Elastic Core Library
//!
//! Addressing, message envelopes and the control-message registry shared by the
//! Elastic actor runtime. Nothing in this crate performs I/O; delivery is delegated
//! to a [`MessageRouter`](traits::MessageRouter) supplied by the runtime.

// Lets `#[elastic_message]` expansions inside this crate resolve `::elastic_core`.
extern crate self as elastic_core;

/// Actor refs, shard and node keys, and the ref-spec grammar.
pub mod address;
/// The error type.
pub mod common;
/// Payloads, envelopes, the envelope codec and control messages.
pub mod message;
/// Message, routing and execution-context traits.
pub mod traits;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use elastic_macro::elastic_message;

    pub use crate::address::{ActorPath, ActorRef, ActorRefKind, ActorRefParser, NodeKey, ShardKey};
    pub use crate::common::ElasticError;
    pub use crate::message::{
        ActivateActor, CancelScheduledMessage, ControlMessage, ControlMessageRegistry, CreateActor,
        DestroyActor, InternalMessage, InternalMessageCodec, MessageCodecs, MessagePayload,
    };
    pub use crate::traits::{ActorExecution, ActorRefFactory, AnyMessage, Message, MessageRouter};
}

pub use traits::Message;
