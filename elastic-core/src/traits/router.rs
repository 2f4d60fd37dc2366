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
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use static_assertions::assert_impl_all;
use tokio::sync::oneshot;
use tracing::trace;

use crate::address::ActorRef;
use crate::common::ElasticError;
use crate::message::{DestroyActor, InternalMessage, MessagePayload};

/// Outstanding `ask`, resolving with the reply envelope or with an error when the
/// request bounced.
///
/// Owns the temporary reply-to actor: dropping the handle before it resolves
/// destroys that actor, so abandoned asks do not leave it behind.
#[derive(Debug)]
pub struct PendingReply {
    reply_to: ActorRef,
    receiver: oneshot::Receiver<Result<InternalMessage, ElasticError>>,
    settled: bool,
}

impl PendingReply {
    #[must_use]
    pub fn new(reply_to: ActorRef, receiver: oneshot::Receiver<Result<InternalMessage, ElasticError>>) -> Self {
        Self {
            reply_to,
            receiver,
            settled: false,
        }
    }

    /// The temporary actor the reply is addressed to.
    #[inline]
    pub const fn reply_to(&self) -> &ActorRef {
        &self.reply_to
    }
}

assert_impl_all!(PendingReply: Send, Sync);

impl Future for PendingReply {
    type Output = Result<InternalMessage, ElasticError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = ready!(Pin::new(&mut self.receiver).poll(cx));
        self.settled = true;
        Poll::Ready(outcome.unwrap_or_else(|_| {
            Err(ElasticError::Delivery(format!(
                "reply actor {} stopped before answering",
                self.reply_to
            )))
        }))
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.receiver.close();
        let destroy = DestroyActor {
            actor_ref: self.reply_to.clone(),
        };
        let outcome = destroy
            .to_payload()
            .and_then(|payload| self.reply_to.try_tell_payload(payload, None));
        if let Err(e) = outcome {
            trace!(reply_to = %self.reply_to, error = %e, "abandoned ask left no reply actor to destroy");
        }
    }
}

/// Resolves the container addressed by a ref and forwards envelopes to it.
///
/// Refs hold only a weak handle to their router, so containers and refs never own
/// each other; the router looks containers up by key.
pub trait MessageRouter: Send + Sync {
    /// Wraps `payload` in an envelope and enqueues it at the container hosting
    /// `receiver`.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Delivery`] or [`ElasticError::Addressing`] when no
    /// container or transport can accept the message.
    fn route(
        &self,
        sender: Option<&ActorRef>,
        receiver: &ActorRef,
        payload: MessagePayload,
    ) -> Result<(), ElasticError>;

    /// Creates a single-use temporary actor, sends `payload` to `receiver` with that
    /// actor as the sender, and returns a handle to its first reply.
    ///
    /// # Errors
    ///
    /// Fails when the temporary actor cannot be created or the request cannot be routed.
    fn ask(&self, receiver: &ActorRef, payload: MessagePayload) -> Result<PendingReply, ElasticError>;
}

/// Turns spec strings back into live refs.
pub trait ActorRefFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ElasticError::Addressing`] for malformed specs.
    fn create(&self, spec: &str) -> Result<ActorRef, ElasticError>;
}

/// The execution context a handler runs in.
///
/// Passed explicitly to operations that need an implied sender. Code running outside
/// any actor supplies a context whose `current_actor` is `None`.
pub trait ActorExecution {
    /// The actor currently executing, if any.
    fn current_actor(&self) -> Option<&ActorRef>;
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex, Weak};

    use super::*;
    use crate::address::NodeKey;

    #[derive(Default)]
    struct RecordingRouter(Mutex<Vec<String>>);

    impl MessageRouter for RecordingRouter {
        fn route(&self, _sender: Option<&ActorRef>, _receiver: &ActorRef, payload: MessagePayload) -> Result<(), ElasticError> {
            self.0.lock().unwrap().push(payload.type_name().to_string());
            Ok(())
        }

        fn ask(&self, _receiver: &ActorRef, _payload: MessagePayload) -> Result<PendingReply, ElasticError> {
            Err(ElasticError::IllegalState("not used".into()))
        }
    }

    type ReplySender = oneshot::Sender<Result<InternalMessage, ElasticError>>;

    fn pending(router: &Arc<RecordingRouter>) -> (ReplySender, PendingReply) {
        let handle: Weak<dyn MessageRouter> = { let r: Arc<dyn MessageRouter> = router.clone(); Arc::downgrade(&r) };
        let reply_to = ActorRef::node("local", NodeKey::new("orders", "n1"), Some("tmp-1".into()), Some(handle)).unwrap();
        let (reply, receiver) = oneshot::channel();
        (reply, PendingReply::new(reply_to, receiver))
    }

    #[test]
    fn dropping_an_unresolved_reply_destroys_the_reply_actor() {
        let router = Arc::new(RecordingRouter::default());
        let (_reply, pending) = pending(&router);
        drop(pending);
        assert_eq!(*router.0.lock().unwrap(), vec![DestroyActor::TYPE_NAME.to_string()]);
    }

    #[tokio::test]
    async fn settled_replies_leave_the_reply_actor_alone() {
        let router = Arc::new(RecordingRouter::default());
        let (reply, pending) = pending(&router);
        drop(reply);
        assert!(matches!(pending.await, Err(ElasticError::Delivery(_))));
        assert!(router.0.lock().unwrap().is_empty());
    }
}
