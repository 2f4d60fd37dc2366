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

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use elastic_core::address::{ActorRef, ActorRefKind, ShardKey};
use elastic_core::common::ElasticError;
use elastic_core::message::{MessageCodecs, MessagePayload};
use elastic_core::traits::Message;

use crate::actor::ActorShard;
use crate::events::{ActorSystemEvent, ActorSystemEventListener, ActorSystemEventListenerRepository};

/// Durable per-shard lifecycle subscriptions.
///
/// Listeners are stored under the shard of the subscribing actor, so they move with
/// the shard when it is rebalanced and fire on whichever node owns it next.
pub struct ActorSystemEventRegistry {
    repository: Arc<dyn ActorSystemEventListenerRepository>,
    codecs: MessageCodecs,
}

impl std::fmt::Debug for ActorSystemEventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSystemEventRegistry")
            .field("codecs", &self.codecs)
            .finish_non_exhaustive()
    }
}

fn shard_of(receiver: &ActorRef) -> Result<(&ShardKey, &str), ElasticError> {
    match (receiver.kind(), receiver.shard_key(), receiver.actor_id()) {
        (ActorRefKind::PersistentShard, Some(shard), Some(actor_id)) => Ok((shard, actor_id)),
        _ => Err(ElasticError::Addressing(format!(
            "ActorRef must reference a persistent actor on a local shard, got {receiver}"
        ))),
    }
}

impl ActorSystemEventRegistry {
    pub fn new(repository: Arc<dyn ActorSystemEventListenerRepository>, codecs: MessageCodecs) -> Self {
        Self { repository, codecs }
    }

    /// Subscribes `receiver` to `event`; `message` is delivered to it each time the
    /// event fires on its shard.
    ///
    /// # Errors
    ///
    /// * [`ElasticError::Addressing`] unless `receiver` is a local persistent shard actor.
    /// * [`ElasticError::Serialization`] when `message` cannot be encoded.
    /// * Repository errors.
    pub async fn register<M: Message>(
        &self,
        receiver: &ActorRef,
        event: ActorSystemEvent,
        message: &M,
    ) -> Result<(), ElasticError> {
        shard_of(receiver)?;
        self.register_payload(receiver, event, MessagePayload::from_message(message)?)
            .await
    }

    /// Subscribes `receiver` with an already serialized message.
    ///
    /// # Errors
    ///
    /// See [`ActorSystemEventRegistry::register`].
    #[instrument(skip(self, receiver, payload), fields(receiver = %receiver, event = %event))]
    pub async fn register_payload(
        &self,
        receiver: &ActorRef,
        event: ActorSystemEvent,
        payload: MessagePayload,
    ) -> Result<(), ElasticError> {
        let (shard, actor_id) = shard_of(receiver)?;
        let listener = ActorSystemEventListener::new(actor_id, event, payload);
        self.repository.create(shard, event, &listener).await?;
        debug!(message_type = listener.message_type(), "registered event listener");
        Ok(())
    }

    /// Removes `receiver`'s subscription to `event`, if any.
    ///
    /// # Errors
    ///
    /// [`ElasticError::Addressing`] unless `receiver` is a local persistent shard
    /// actor, and repository errors.
    #[instrument(skip(self, receiver), fields(receiver = %receiver, event = %event))]
    pub async fn deregister(&self, receiver: &ActorRef, event: ActorSystemEvent) -> Result<(), ElasticError> {
        let (shard, actor_id) = shard_of(receiver)?;
        self.repository.delete(shard, event, actor_id).await
    }

    /// Delivers every stored listener message for (`shard`, `event`), anonymously.
    ///
    /// Listeners whose message type has no registered codec are skipped; decode and
    /// delivery failures are logged per listener. Nothing is returned to the caller
    /// except the number of messages handed to the shard.
    #[instrument(skip(self, shard), fields(shard = %shard.key(), event = %event))]
    pub async fn generate_events(&self, shard: &ActorShard, event: ActorSystemEvent) -> usize {
        let listeners = match self.repository.get_all(shard.key(), event).await {
            Ok(listeners) => listeners,
            Err(e) => {
                error!(error = %e, "Failed to load event listeners");
                return 0;
            }
        };

        let mut delivered = 0;
        for listener in &listeners {
            match self.dispatch(shard, listener) {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(e) => error!(
                    message_type = listener.message_type(),
                    actor_id = listener.actor_id(),
                    error = %e,
                    "Failed to deliver event listener message"
                ),
            }
        }
        debug!(listeners = listeners.len(), delivered, "generated events");
        delivered
    }

    fn dispatch(&self, shard: &ActorShard, listener: &ActorSystemEventListener) -> Result<bool, ElasticError> {
        let Some(deserializer) = self.codecs.deserializer(listener.message_type()) else {
            warn!(
                message_type = listener.message_type(),
                actor_id = listener.actor_id(),
                "No deserializer for event listener message, skipping"
            );
            return Ok(false);
        };
        let message = deserializer(listener.message_bytes())?;
        let receiver = shard.actor_ref(listener.actor_id())?;
        shard.send_message(None, &receiver, message.to_payload()?)?;
        Ok(true)
    }
}
