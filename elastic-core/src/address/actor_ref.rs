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
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use serde::{Serialize, Serializer};
use static_assertions::assert_impl_all;
use tracing::{error, instrument, trace};

use crate::address::path::{generate_spec, segment};
use crate::address::{ActorPath, NodeKey, ShardKey};
use crate::common::ElasticError;
use crate::message::MessagePayload;
use crate::traits::{ActorExecution, Message, MessageRouter, PendingReply};

/// The addressing variant of a ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRefKind {
    /// A persistent actor on a shard of a local actor system.
    PersistentShard,
    /// A node-local actor, including temporary actors and the node itself.
    LocalNode,
    /// A service actor on a local node.
    Service,
    /// Any actor in another cluster.
    RemoteCluster,
}

/// An immutable, cheaply cloneable address of an actor.
///
/// Identity is the canonical spec string: two refs built independently for the same
/// address compare and hash equal, whatever their router binding.
///
/// A ref holds only a weak handle to the router that resolves its container. Refs
/// produced by a runtime send through it; refs parsed without a router can be
/// compared and formatted but every send on them is logged and dropped.
#[derive(Clone)]
pub struct ActorRef {
    inner: Arc<ActorRefInner>,
}

struct ActorRefInner {
    cluster: String,
    path: ActorPath,
    remote: bool,
    spec: String,
    router: Option<Weak<dyn MessageRouter>>,
}

assert_impl_all!(ActorRef: Send, Sync, Clone);

impl ActorRef {
    /// Builds a ref for `path` in `cluster`.
    ///
    /// `remote` marks the ref as addressing another cluster; such refs are sent
    /// through the cluster transport instead of a local container.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] when a component is empty, contains `/`
    /// where it must not, or a node actor id uses the reserved service namespace.
    pub fn new(
        cluster: impl Into<String>,
        path: ActorPath,
        remote: bool,
        router: Option<Weak<dyn MessageRouter>>,
    ) -> Result<Self, ElasticError> {
        let cluster = cluster.into();
        segment("cluster", &cluster)?;
        path.validate()?;
        let spec = generate_spec(&cluster, &path);
        Ok(Self {
            inner: Arc::new(ActorRefInner {
                cluster,
                path,
                remote,
                spec,
                router,
            }),
        })
    }

    /// Ref to persistent actor `actor_id` on `shard`.
    ///
    /// # Errors
    ///
    /// See [`ActorRef::new`].
    pub fn shard(
        cluster: impl Into<String>,
        shard: ShardKey,
        actor_id: impl Into<String>,
        router: Option<Weak<dyn MessageRouter>>,
    ) -> Result<Self, ElasticError> {
        let path = ActorPath::Shard {
            shard,
            actor_id: actor_id.into(),
        };
        Self::new(cluster, path, false, router)
    }

    /// Ref to a node-local actor, or to the node itself when `actor_id` is `None`.
    ///
    /// # Errors
    ///
    /// See [`ActorRef::new`].
    pub fn node(
        cluster: impl Into<String>,
        node: NodeKey,
        actor_id: Option<String>,
        router: Option<Weak<dyn MessageRouter>>,
    ) -> Result<Self, ElasticError> {
        Self::new(cluster, ActorPath::Node { node, actor_id }, false, router)
    }

    /// Ref to service `service_id` hosted by `node`.
    ///
    /// # Errors
    ///
    /// See [`ActorRef::new`].
    pub fn service(
        cluster: impl Into<String>,
        node: NodeKey,
        service_id: impl Into<String>,
        router: Option<Weak<dyn MessageRouter>>,
    ) -> Result<Self, ElasticError> {
        let path = ActorPath::Service {
            node,
            service_id: service_id.into(),
        };
        Self::new(cluster, path, false, router)
    }

    /// The canonical spec string.
    #[inline]
    #[must_use]
    pub fn spec(&self) -> &str {
        &self.inner.spec
    }

    #[inline]
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.inner.cluster
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &ActorPath {
        &self.inner.path
    }

    #[inline]
    #[must_use]
    pub fn actor_system(&self) -> &str {
        self.inner.path.actor_system()
    }

    /// The actor id (service id for services, `None` for a node itself).
    #[inline]
    #[must_use]
    pub fn actor_id(&self) -> Option<&str> {
        self.inner.path.actor_id()
    }

    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.inner.remote
    }

    #[must_use]
    pub fn kind(&self) -> ActorRefKind {
        if self.inner.remote {
            return ActorRefKind::RemoteCluster;
        }
        match self.inner.path {
            ActorPath::Shard { .. } => ActorRefKind::PersistentShard,
            ActorPath::Node { .. } => ActorRefKind::LocalNode,
            ActorPath::Service { .. } => ActorRefKind::Service,
        }
    }

    /// The shard this ref addresses, for shard refs.
    #[must_use]
    pub fn shard_key(&self) -> Option<&ShardKey> {
        match &self.inner.path {
            ActorPath::Shard { shard, .. } => Some(shard),
            _ => None,
        }
    }

    /// The node this ref addresses, for node and service refs.
    #[must_use]
    pub fn node_key(&self) -> Option<&NodeKey> {
        match &self.inner.path {
            ActorPath::Node { node, .. } | ActorPath::Service { node, .. } => Some(node),
            ActorPath::Shard { .. } => None,
        }
    }

    /// Key of the actor inside its container.
    #[must_use]
    pub fn local_key(&self) -> String {
        self.inner.path.local_key()
    }

    /// Returns a ref to the same address bound to `router`.
    #[must_use]
    pub fn with_router(&self, router: Weak<dyn MessageRouter>) -> Self {
        Self {
            inner: Arc::new(ActorRefInner {
                cluster: self.inner.cluster.clone(),
                path: self.inner.path.clone(),
                remote: self.inner.remote,
                spec: self.inner.spec.clone(),
                router: Some(router),
            }),
        }
    }

    fn router(&self) -> Option<Arc<dyn MessageRouter>> {
        self.inner.router.as_ref().and_then(Weak::upgrade)
    }

    /// Sends `message` fire-and-forget.
    ///
    /// Delivery is best-effort: serialization and routing failures are logged and
    /// never returned to the caller.
    pub fn tell<M: Message>(&self, message: M, sender: Option<&ActorRef>) {
        match MessagePayload::from_message(&message) {
            Ok(payload) => self.tell_payload(payload, sender),
            Err(e) => error!(receiver = %self, message_type = M::TYPE_NAME, error = %e, "Failed to serialize message"),
        }
    }

    /// Sends an already serialized payload, best-effort.
    pub fn tell_payload(&self, payload: MessagePayload, sender: Option<&ActorRef>) {
        if let Err(e) = self.try_tell_payload(payload, sender) {
            error!(receiver = %self, error = %e, "Failed to send message to {}", self);
        }
    }

    /// Sends an already serialized payload, returning routing failures.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Delivery`] when the ref is unbound or its container
    /// cannot accept the message.
    #[instrument(skip(self, payload, sender), fields(receiver = %self, message_type = payload.type_name()))]
    pub fn try_tell_payload(
        &self,
        payload: MessagePayload,
        sender: Option<&ActorRef>,
    ) -> Result<(), ElasticError> {
        let router = self
            .router()
            .ok_or_else(|| ElasticError::Delivery(format!("{self} is not bound to a running runtime")))?;
        trace!("routing message");
        router.route(sender, self, payload)
    }

    /// Sends `message` with the actor currently executing in `context` as sender.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::IllegalState`] when `context` has no current actor.
    pub fn tell_from<M: Message>(&self, message: M, context: &dyn ActorExecution) -> Result<(), ElasticError> {
        let sender = context.current_actor().ok_or_else(|| {
            ElasticError::IllegalState(
                "tell without an explicit sender requires an active actor context".to_string(),
            )
        })?;
        self.tell(message, Some(sender));
        Ok(())
    }

    /// Sends `message` and returns a future resolving with the reply of type `R`.
    ///
    /// The request is routed before this returns, with a single-use temporary actor as
    /// the reply-to address. That actor is torn down once the first reply (or bounce)
    /// arrives, or when the returned future is dropped unresolved. The future borrows
    /// nothing, so it can be moved into a task.
    ///
    /// # Errors
    ///
    /// * [`ElasticError::UnexpectedResponse`] when the reply carries another type tag.
    /// * [`ElasticError::Undeliverable`] when the target does not exist.
    /// * [`ElasticError::Delivery`] when the request cannot be routed.
    pub fn ask<M: Message, R: Message>(
        &self,
        message: M,
    ) -> impl Future<Output = Result<R, ElasticError>> + Send + 'static {
        let pending = self.request(&message);
        async move {
            let reply = pending?.await?;
            if reply.payload_type_name() != R::TYPE_NAME {
                return Err(ElasticError::UnexpectedResponse {
                    expected: R::TYPE_NAME.to_string(),
                    actual: reply.payload_type_name().to_string(),
                });
            }
            R::decode(reply.payload())
        }
    }

    fn request<M: Message>(&self, message: &M) -> Result<PendingReply, ElasticError> {
        let payload = MessagePayload::from_message(message)?;
        let router = self
            .router()
            .ok_or_else(|| ElasticError::Delivery(format!("{self} is not bound to a running runtime")))?;
        router.ask(self, payload)
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.spec == other.inner.spec
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.spec.hash(state);
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.spec)
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("spec", &self.inner.spec)
            .field("kind", &self.kind())
            .finish()
    }
}

impl Serialize for ActorRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner.spec)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn shard_ref() -> ActorRef {
        ActorRef::shard("local", ShardKey::new("orders", 2), "order-1", None).unwrap()
    }

    #[test]
    fn refs_compare_by_spec() {
        let a = shard_ref();
        let b = shard_ref();
        assert_eq!(a, b);
        let set: HashSet<ActorRef> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn kinds_follow_variant_and_cluster() {
        assert_eq!(shard_ref().kind(), ActorRefKind::PersistentShard);

        let node = NodeKey::new("orders", "n1");
        let temp = ActorRef::node("local", node.clone(), Some("t-1".into()), None).unwrap();
        assert_eq!(temp.kind(), ActorRefKind::LocalNode);

        let service = ActorRef::service("local", node.clone(), "clock", None).unwrap();
        assert_eq!(service.kind(), ActorRefKind::Service);
        assert_eq!(service.spec(), "actor://local/orders/nodes/n1/services/clock");

        let remote = ActorRef::new(
            "other",
            ActorPath::Shard {
                shard: ShardKey::new("orders", 1),
                actor_id: "x".into(),
            },
            true,
            None,
        )
        .unwrap();
        assert_eq!(remote.kind(), ActorRefKind::RemoteCluster);
        assert!(remote.shard_key().is_some());
    }

    #[test]
    fn rejects_node_ids_in_service_namespace() {
        let node = NodeKey::new("orders", "n1");
        let result = ActorRef::node("local", node, Some("services/clock".into()), None);
        assert!(matches!(result, Err(ElasticError::Addressing(_))));
    }

    #[test]
    fn unbound_refs_report_delivery_failure() {
        let payload = MessagePayload::new("Ping", Vec::new(), true);
        let result = shard_ref().try_tell_payload(payload, None);
        assert!(matches!(result, Err(ElasticError::Delivery(_))));
    }

    #[test]
    fn serializes_as_spec_string() {
        let json = serde_json::to_string(&shard_ref()).unwrap();
        assert_eq!(json, "\"actor://local/orders/shards/2/order-1\"");
    }
}
