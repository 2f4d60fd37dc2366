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

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{instrument, trace};

use elastic_core::address::{ActorRef, ActorRefParser};
use elastic_core::common::ElasticError;
use elastic_core::message::{InternalMessage, InternalMessageCodec, MessagePayload};
use elastic_core::traits::{ActorRefFactory, MessageRouter, PendingReply};

use crate::actor::ActorSystem;
use crate::common::RemoteClusterTransport;

/// Routes envelopes to local actor systems or to remote cluster transports.
///
/// Every ref the runtime hands out is bound to this router through a weak handle.
pub(crate) struct ClusterRouter {
    me: Weak<ClusterRouter>,
    cluster_name: String,
    systems: DashMap<String, ActorSystem>,
    remotes: DashMap<String, Arc<dyn RemoteClusterTransport>>,
}

impl ClusterRouter {
    pub(crate) fn new(cluster_name: impl Into<String>) -> Arc<Self> {
        let cluster_name = cluster_name.into();
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            cluster_name,
            systems: DashMap::new(),
            remotes: DashMap::new(),
        })
    }

    pub(crate) fn weak(&self) -> Weak<Self> {
        self.me.clone()
    }

    pub(crate) fn handle(&self) -> Weak<dyn MessageRouter> {
        self.me.clone()
    }

    pub(crate) fn refs(&self) -> ActorRefParser {
        ActorRefParser::new(self.cluster_name.clone(), self.handle())
    }

    pub(crate) fn add_system(&self, system: ActorSystem) {
        self.systems.insert(system.name().to_owned(), system);
    }

    pub(crate) fn system(&self, name: &str) -> Option<ActorSystem> {
        self.systems.get(name).map(|s| s.value().clone())
    }

    pub(crate) fn systems(&self) -> Vec<ActorSystem> {
        let mut systems: Vec<ActorSystem> = self.systems.iter().map(|s| s.value().clone()).collect();
        systems.sort_by(|a, b| a.name().cmp(b.name()));
        systems
    }

    pub(crate) fn register_transport(&self, cluster: impl Into<String>, transport: Arc<dyn RemoteClusterTransport>) {
        self.remotes.insert(cluster.into(), transport);
    }

    /// Routes a complete envelope, preserving its id and flags.
    #[instrument(skip(self, message), fields(receiver = %message.receiver(), message_type = message.payload_type_name()))]
    pub(crate) fn deliver(&self, message: InternalMessage) -> Result<(), ElasticError> {
        let receiver = message.receiver();
        if receiver.is_remote() {
            let transport = self
                .remotes
                .get(receiver.cluster())
                .map(|t| Arc::clone(t.value()))
                .ok_or_else(|| {
                    ElasticError::Delivery(format!("no transport for remote cluster {}", receiver.cluster()))
                })?;
            trace!(cluster = receiver.cluster(), "sending to remote cluster");
            return transport.send(receiver.cluster(), InternalMessageCodec::encode(&message)?);
        }
        let system = self
            .system(receiver.actor_system())
            .ok_or_else(|| ElasticError::Addressing(format!("unknown actor system {}", receiver.actor_system())))?;
        system.deliver(message)
    }

    /// System that hosts the reply actor for an ask to `receiver`.
    fn reply_system(&self, receiver: &ActorRef) -> Result<ActorSystem, ElasticError> {
        if !receiver.is_remote() {
            if let Some(system) = self.system(receiver.actor_system()) {
                return Ok(system);
            }
        }
        self.systems()
            .into_iter()
            .next()
            .ok_or_else(|| ElasticError::IllegalState("no local actor system to receive replies".to_string()))
    }
}

impl MessageRouter for ClusterRouter {
    fn route(&self, sender: Option<&ActorRef>, receiver: &ActorRef, payload: MessagePayload) -> Result<(), ElasticError> {
        self.deliver(InternalMessage::new(sender.cloned(), receiver.clone(), payload))
    }

    fn ask(&self, receiver: &ActorRef, payload: MessagePayload) -> Result<PendingReply, ElasticError> {
        let system = self.reply_system(receiver)?;
        let (reply, receiver_half) = oneshot::channel();
        let temp = system.spawn_reply_actor(reply)?;
        if let Err(e) = self.route(Some(&temp), receiver, payload) {
            system.node().remove_actor(&temp);
            return Err(e);
        }
        Ok(PendingReply::new(temp, receiver_half))
    }
}

impl ActorRefFactory for ClusterRouter {
    fn create(&self, spec: &str) -> Result<ActorRef, ElasticError> {
        self.refs().create(spec)
    }
}
