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

use elastic_runtime::prelude::*;

#[elastic_message(name = "test.Greeting")]
pub struct Greeting {
    pub text: String,
}

#[elastic_message(name = "test.Echoed")]
pub struct Echoed {
    pub text: String,
}

/// The request a relay forwards; answered with an [`Echoed`].
#[elastic_message(name = "test.Ping")]
pub struct Ping {
    pub text: String,
}

/// A reply type nobody asks for.
#[elastic_message(name = "test.Shrug")]
pub struct Shrug;

#[elastic_message(name = "test.Tick")]
pub struct Tick {
    pub seq: u32,
}

/// Asks a recording actor to schedule a [`Tick`] to itself.
#[elastic_message(name = "test.ScheduleTick")]
pub struct ScheduleTick {
    pub seq: u32,
    pub delay_ms: u64,
}

#[elastic_message(name = "test.Scheduled")]
pub struct Scheduled {
    pub message_ref: String,
}

/// Asks a recording actor to subscribe to `event` with a [`ShardEvent`] carrying `marker`.
#[elastic_message(name = "test.Subscribe")]
pub struct Subscribe {
    pub event: ActorSystemEvent,
    pub marker: String,
    pub unsubscribe: bool,
}

#[elastic_message(name = "test.Subscribed")]
pub struct Subscribed;

#[elastic_message(name = "test.ShardEvent")]
pub struct ShardEvent {
    pub marker: String,
}

/// Registers every test message with a runtime.
pub fn register_messages(runtime: &ElasticRuntime) {
    runtime.register_message::<Greeting>();
    runtime.register_message::<Echoed>();
    runtime.register_message::<Ping>();
    runtime.register_message::<Shrug>();
    runtime.register_message::<Tick>();
    runtime.register_message::<ScheduleTick>();
    runtime.register_message::<Scheduled>();
    runtime.register_message::<Subscribe>();
    runtime.register_message::<Subscribed>();
    runtime.register_message::<ShardEvent>();
}
