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

pub use actor_system::ActorSystem;
pub use context::{ActorContext, ReplyHandle};
pub use elastic_actor::{ActorFactory, ElasticActor};
pub use node::ActorNode;
pub use shard::ActorShard;
pub use system_context::shard_for;
pub(crate) use system_context::SystemContext;

mod actor_system;
mod container;
mod context;
mod elastic_actor;
mod mailbox;
mod node;
mod reply;
mod shard;
mod system_context;
