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

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn, Instrument};

use elastic_core::address::{ActorRef, NodeKey, ShardKey};
use elastic_core::common::ElasticError;
use elastic_core::message::{
    ActivateActor, CancelScheduledMessage, ControlMessage, ControlMessageRegistry, CreateActor, InternalMessage,
};

use crate::actor::mailbox::Mailbox;
use crate::actor::{ElasticActor, SystemContext};
use crate::scheduler::ScheduledMessageKey;

/// What a container hosts.
#[derive(Clone, Debug)]
pub(crate) enum Locality {
    Shard(ShardKey),
    Node(NodeKey),
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shard(key) => write!(f, "{key}"),
            Self::Node(key) => write!(f, "{key}"),
        }
    }
}

/// Hosts the actors of one shard or node.
///
/// Envelopes enter through a single inbox. The dispatcher task applies control
/// messages itself and hands everything else to the receiving actor's mailbox.
pub(crate) struct ActorContainer {
    locality: Locality,
    inbox: mpsc::UnboundedSender<InternalMessage>,
    actors: Arc<DashMap<String, Mailbox>>,
    system: Arc<SystemContext>,
}

impl ActorContainer {
    pub(crate) fn spawn(locality: Locality, system: Arc<SystemContext>, cancel: CancellationToken) -> Self {
        let (inbox, receiver) = mpsc::unbounded_channel();
        let actors = Arc::new(DashMap::new());
        let dispatcher = Dispatcher {
            locality: locality.clone(),
            actors: Arc::clone(&actors),
            system: Arc::clone(&system),
        };
        let span = tracing::debug_span!("container", locality = %locality);
        system
            .tracker
            .spawn(dispatcher.run(receiver, cancel).instrument(span));
        Self {
            locality,
            inbox,
            actors,
            system,
        }
    }

    pub(crate) fn system(&self) -> &Arc<SystemContext> {
        &self.system
    }

    pub(crate) fn enqueue(&self, message: InternalMessage) -> Result<(), ElasticError> {
        self.inbox
            .send(message)
            .map_err(|_| ElasticError::Delivery(format!("container {} is shut down", self.locality)))
    }

    /// Places an already constructed actor in this container, bypassing control messages.
    pub(crate) fn insert_actor(&self, self_ref: ActorRef, actor: Box<dyn ElasticActor>) {
        let mailbox = Mailbox::spawn(self_ref.clone(), actor, Arc::clone(&self.system));
        if let Some(previous) = self.actors.insert(self_ref.local_key(), mailbox) {
            previous.stop();
        }
    }

    pub(crate) fn remove_actor(&self, local_key: &str) -> bool {
        self.actors.remove(local_key).map(|(_, mailbox)| mailbox.stop()).is_some()
    }

    pub(crate) fn contains(&self, local_key: &str) -> bool {
        self.actors.contains_key(local_key)
    }

    pub(crate) fn len(&self) -> usize {
        self.actors.len()
    }
}

struct Dispatcher {
    locality: Locality,
    actors: Arc<DashMap<String, Mailbox>>,
    system: Arc<SystemContext>,
}

impl Dispatcher {
    async fn run(self, mut inbox: mpsc::UnboundedReceiver<InternalMessage>, cancel: CancellationToken) {
        trace!("container started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                next = inbox.recv() => match next {
                    Some(message) => self.dispatch(message).await,
                    None => break,
                },
            }
        }
        for entry in self.actors.iter() {
            entry.value().stop();
        }
        self.actors.clear();
        trace!("container stopped");
    }

    async fn dispatch(&self, message: InternalMessage) {
        if let Some(deserializer) = ControlMessageRegistry::global().lookup(message.payload_type_name()) {
            match deserializer.deserialize(message.payload(), &self.system.refs()) {
                Ok(control) => self.apply(control).await,
                Err(e) => error!(
                    message_type = message.payload_type_name(),
                    error = %e,
                    "Failed to decode control message"
                ),
            }
            return;
        }

        let local_key = message.receiver().local_key();
        let outcome = match self.actors.get(&local_key) {
            Some(mailbox) => mailbox.deliver(message),
            None => {
                self.bounce(message);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!(actor = %local_key, error = %e, "Dropped message for stopped actor");
        }
    }

    async fn apply(&self, control: ControlMessage) {
        trace!(control = control.type_name(), "applying control message");
        match control {
            ControlMessage::CreateActor(create) => self.create_actor(&create),
            ControlMessage::DestroyActor(destroy) => {
                let local_key = destroy.actor_ref.local_key();
                if let Some((_, mailbox)) = self.actors.remove(&local_key) {
                    mailbox.stop();
                    debug!(actor = %destroy.actor_ref, "destroyed actor");
                }
            }
            ControlMessage::ActivateActor(activate) => self.activate_actor(&activate),
            ControlMessage::CancelScheduledMessage(cancel) => self.cancel_scheduled(&cancel).await,
        }
    }

    fn self_ref(&self, actor_id: &str) -> Result<ActorRef, ElasticError> {
        match &self.locality {
            Locality::Shard(shard) => self.system.shard_ref_on(shard.clone(), actor_id),
            Locality::Node(_) => self.system.node_ref(Some(actor_id)),
        }
    }

    #[instrument(skip(self, create), fields(actor_id = %create.actor_id, actor_type = %create.actor_type))]
    fn create_actor(&self, create: &CreateActor) {
        if create.actor_system != self.system.name {
            warn!(actor_system = %create.actor_system, "CreateActor addressed to another actor system");
        }
        let result = self.spawn_actor(&create.actor_type, &create.actor_id, create.initial_state.as_deref());
        if let Err(e) = result {
            error!(error = %e, "Failed to create actor");
        }
    }

    fn activate_actor(&self, activate: &ActivateActor) {
        let result = match self.actors.get(&activate.actor_id) {
            Some(mailbox) => mailbox.activate(),
            None => self
                .spawn_actor(&activate.actor_type, &activate.actor_id, None)
                .and_then(|()| match self.actors.get(&activate.actor_id) {
                    Some(mailbox) => mailbox.activate(),
                    None => Ok(()),
                }),
        };
        if let Err(e) = result {
            error!(actor_id = %activate.actor_id, error = %e, "Failed to activate actor");
        }
    }

    /// Idempotent: an existing actor with the same id is kept.
    fn spawn_actor(&self, actor_type: &str, actor_id: &str, initial_state: Option<&[u8]>) -> Result<(), ElasticError> {
        let self_ref = self.self_ref(actor_id)?;
        let local_key = self_ref.local_key();
        if self.actors.contains_key(&local_key) {
            debug!(actor = %self_ref, "actor already exists");
            return Ok(());
        }
        let actor = self.system.instantiate(actor_type, actor_id, initial_state)?;
        let mailbox = Mailbox::spawn(self_ref.clone(), actor, Arc::clone(&self.system));
        self.actors.insert(local_key, mailbox);
        debug!(actor = %self_ref, "created actor");
        Ok(())
    }

    async fn cancel_scheduled(&self, cancel: &CancelScheduledMessage) {
        match &self.locality {
            Locality::Shard(shard) => {
                let key = ScheduledMessageKey::new(cancel.message_id, cancel.fire_time);
                self.system.scheduler.cancel(shard, &key).await;
            }
            Locality::Node(node) => {
                warn!(%node, message_id = %cancel.message_id, "CancelScheduledMessage sent to a node container");
            }
        }
    }

    /// Returns an envelope to its sender flagged as undeliverable, unless it already bounced.
    fn bounce(&self, message: InternalMessage) {
        let Some(bounced) = message.to_undeliverable() else {
            warn!(
                receiver = %message.receiver(),
                message_type = message.payload_type_name(),
                "Dropping undeliverable message"
            );
            return;
        };
        let Some(router) = self.system.router.upgrade() else {
            warn!(receiver = %message.receiver(), "Router gone, dropping undeliverable message");
            return;
        };
        debug!(
            receiver = %message.receiver(),
            message_type = message.payload_type_name(),
            "returning undeliverable message to sender"
        );
        if let Err(e) = router.deliver(bounced) {
            warn!(error = %e, "Failed to return undeliverable message");
        }
    }
}
