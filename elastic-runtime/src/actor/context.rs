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

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, Instrument};

use elastic_core::address::ActorRef;
use elastic_core::common::ElasticError;
use elastic_core::message::{DestroyActor, MessageCodecs};
use elastic_core::traits::{ActorExecution, Message};

use crate::actor::SystemContext;
use crate::events::ActorSystemEvent;
use crate::scheduler::ScheduledMessageRef;

/// Execution context of one handler invocation.
///
/// Carries the executing actor's ref, which is the implied sender of everything the
/// handler sends through the context.
pub struct ActorContext {
    self_ref: ActorRef,
    sender: Option<ActorRef>,
    system: Arc<SystemContext>,
}

impl ActorContext {
    pub(crate) const fn new(self_ref: ActorRef, sender: Option<ActorRef>, system: Arc<SystemContext>) -> Self {
        Self {
            self_ref,
            sender,
            system,
        }
    }

    #[inline]
    pub const fn self_ref(&self) -> &ActorRef {
        &self.self_ref
    }

    /// Sender of the envelope being handled, if it was not anonymous.
    #[inline]
    pub const fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }

    pub fn actor_system_name(&self) -> &str {
        &self.system.name
    }

    pub fn codecs(&self) -> &MessageCodecs {
        &self.system.codecs
    }

    /// Sends `message` to `receiver` with this actor as sender.
    pub fn tell<M: Message>(&self, receiver: &ActorRef, message: M) {
        receiver.tell(message, Some(&self.self_ref));
    }

    /// Replies to the sender of the current envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::IllegalState`] when the envelope was anonymous.
    pub fn reply<M: Message>(&self, message: M) -> Result<(), ElasticError> {
        reply_to(&self.self_ref, self.sender.as_ref(), message)
    }

    /// Asks `receiver`, returning a future that owns everything it needs.
    ///
    /// Awaiting the future inside the handler suspends this actor until the reply
    /// arrives, so an ask that can come back to this actor (itself, or a cycle through
    /// other actors) must be handed to [`spawn`](Self::spawn) instead. The handler then
    /// returns and the mailbox keeps draining.
    ///
    /// # Errors
    ///
    /// The future fails as described for [`ActorRef::ask`].
    pub fn ask<M: Message, R: Message>(
        &self,
        receiver: &ActorRef,
        message: M,
    ) -> impl Future<Output = Result<R, ElasticError>> + Send + 'static {
        receiver.ask(message)
    }

    /// Runs `task` next to this actor, tracked by the runtime so shutdown waits for it.
    ///
    /// The task does not hold the actor's state; it talks back through refs, usually
    /// [`reply_handle`](Self::reply_handle).
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let span = tracing::trace_span!("actor_task", actor = %self.self_ref);
        self.system.tracker.spawn(task.instrument(span));
    }

    /// Detached handle for replying to the current sender after the handler returned.
    #[must_use]
    pub fn reply_handle(&self) -> ReplyHandle {
        ReplyHandle {
            self_ref: self.self_ref.clone(),
            sender: self.sender.clone(),
        }
    }

    /// Ref to persistent actor `actor_id` in this actor's system.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] for invalid ids.
    pub fn actor_for(&self, actor_id: &str) -> Result<ActorRef, ElasticError> {
        self.system.shard_ref(actor_id)
    }

    /// Schedules `message` for `receiver` after `delay`, with this actor as sender.
    ///
    /// # Errors
    ///
    /// See [`ShardedScheduler::schedule_once`](crate::scheduler::ShardedScheduler::schedule_once).
    pub async fn schedule_once<M: Message>(
        &self,
        message: &M,
        receiver: &ActorRef,
        delay: Duration,
    ) -> Result<ScheduledMessageRef, ElasticError> {
        self.system
            .scheduler
            .schedule_once(&self.self_ref, message, receiver, delay)
            .await
    }

    /// Subscribes this actor to `event` on its shard.
    ///
    /// # Errors
    ///
    /// See [`ActorSystemEventRegistry::register`](crate::events::ActorSystemEventRegistry::register).
    pub async fn register_event_listener<M: Message>(
        &self,
        event: ActorSystemEvent,
        message: &M,
    ) -> Result<(), ElasticError> {
        self.system.events.register(&self.self_ref, event, message).await
    }

    /// # Errors
    ///
    /// See [`ActorSystemEventRegistry::deregister`](crate::events::ActorSystemEventRegistry::deregister).
    pub async fn deregister_event_listener(&self, event: ActorSystemEvent) -> Result<(), ElasticError> {
        self.system.events.deregister(&self.self_ref, event).await
    }

    /// Destroys this actor once the current envelope has been handled.
    pub fn stop_self(&self) {
        let destroy = DestroyActor {
            actor_ref: self.self_ref.clone(),
        };
        match destroy.to_payload() {
            Ok(payload) => self.self_ref.tell_payload(payload, None),
            Err(e) => error!(actor = %self.self_ref, error = %e, "Failed to encode DestroyActor"),
        }
    }
}

/// The reply address of one envelope, detached from its handler invocation.
#[derive(Debug, Clone)]
pub struct ReplyHandle {
    self_ref: ActorRef,
    sender: Option<ActorRef>,
}

impl ReplyHandle {
    /// Replies with the original actor as sender.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::IllegalState`] when the envelope was anonymous.
    pub fn reply<M: Message>(&self, message: M) -> Result<(), ElasticError> {
        reply_to(&self.self_ref, self.sender.as_ref(), message)
    }
}

fn reply_to<M: Message>(self_ref: &ActorRef, sender: Option<&ActorRef>, message: M) -> Result<(), ElasticError> {
    let sender =
        sender.ok_or_else(|| ElasticError::IllegalState(format!("{self_ref} has no sender to reply to")))?;
    sender.tell(message, Some(self_ref));
    Ok(())
}

impl ActorExecution for ActorContext {
    fn current_actor(&self) -> Option<&ActorRef> {
        Some(&self.self_ref)
    }
}
