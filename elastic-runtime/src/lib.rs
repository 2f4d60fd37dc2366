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

//! # Elastic Runtime
//!
//! Hosts sharded actor systems for one node of a cluster. Persistent actors live on
//! shards, temp actors and services live on the node, and every actor is reached
//! through an [`ActorRef`](elastic_core::address::ActorRef) whose spec is stable
//! across nodes and restarts.
//!
//! ## Key Concepts
//!
//! - **Runtime (`ElasticRuntime`)**: owns the local actor systems, the cluster router,
//!   the scheduler and the event registry. Started through [`ElasticApp`](common::ElasticApp).
//! - **Actors (`ElasticActor`)**: user behaviour, driven one envelope at a time.
//! - **Scheduler (`ShardedScheduler`)**: persistence-backed delayed delivery, sharded
//!   by the sending actor.
//! - **Lifecycle events (`ActorSystemEventRegistry`)**: durable per-shard subscriptions
//!   fired when a shard is acquired or released.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use elastic_runtime::prelude::*;
//!
//! #[elastic_message(name = "demo.Ping")]
//! struct Ping;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ElasticApp::launch_async().await?;
//!     runtime.register_message::<Ping>();
//!     let system = runtime.actor_system("default").expect("configured");
//!     system.register_actor_type("demo.Pinger", |_, _| Ok(Box::new(Pinger)));
//!     let pinger = system.actor_of("pinger-1", "demo.Pinger", None)?;
//!     pinger.tell(Ping, None);
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

/// Actor systems, containers, mailboxes and the actor trait.
pub mod actor;

/// Configuration, the runtime handle and cluster routing.
pub mod common;

/// Per-shard lifecycle event subscriptions.
pub mod events;

/// Persistence-backed delayed delivery.
pub mod scheduler;

/// A prelude module for conveniently importing the most commonly used items.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use elastic_core::prelude::*;

    pub use crate::actor::{ActorContext, ActorNode, ActorShard, ActorSystem, ElasticActor, ReplyHandle};
    pub use crate::common::{ElasticApp, ElasticConfig, ElasticRuntime, RemoteClusterTransport};
    pub use crate::events::{ActorSystemEvent, ActorSystemEventListenerRepository, ActorSystemEventRegistry};
    pub use crate::scheduler::{ScheduledMessageRef, ScheduledMessageRepository, ShardedScheduler};
}
