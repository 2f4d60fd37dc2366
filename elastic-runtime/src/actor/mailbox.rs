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

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{error, trace, Instrument};

use elastic_core::address::ActorRef;
use elastic_core::common::ElasticError;
use elastic_core::message::InternalMessage;

use crate::actor::{ActorContext, ElasticActor, SystemContext};

pub(crate) enum MailboxItem {
    Deliver(InternalMessage),
    Activate,
    Stop,
}

/// Serial inbox of one actor instance.
///
/// A dedicated task owns the actor and handles items one at a time, so an actor never
/// observes two envelopes concurrently.
pub(crate) struct Mailbox {
    self_ref: ActorRef,
    sender: mpsc::UnboundedSender<MailboxItem>,
}

impl Mailbox {
    pub(crate) fn spawn(self_ref: ActorRef, actor: Box<dyn ElasticActor>, system: Arc<SystemContext>) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        let span = tracing::trace_span!("mailbox", actor = %self_ref);
        system
            .tracker
            .spawn(run(self_ref.clone(), actor, Arc::clone(&system), inbox).instrument(span));
        Self { self_ref, sender }
    }

    pub(crate) fn deliver(&self, message: InternalMessage) -> Result<(), ElasticError> {
        self.send(MailboxItem::Deliver(message))
    }

    pub(crate) fn activate(&self) -> Result<(), ElasticError> {
        self.send(MailboxItem::Activate)
    }

    pub(crate) fn stop(&self) {
        // already gone is fine
        let _ = self.sender.send(MailboxItem::Stop);
    }

    fn send(&self, item: MailboxItem) -> Result<(), ElasticError> {
        self.sender
            .send(item)
            .map_err(|_| ElasticError::Delivery(format!("mailbox of {} is closed", self.self_ref)))
    }
}

async fn run(
    self_ref: ActorRef,
    mut actor: Box<dyn ElasticActor>,
    system: Arc<SystemContext>,
    mut inbox: mpsc::UnboundedReceiver<MailboxItem>,
) {
    trace!("mailbox started");
    while let Some(item) = inbox.recv().await {
        match item {
            MailboxItem::Deliver(envelope) => {
                let ctx = ActorContext::new(self_ref.clone(), envelope.sender().cloned(), Arc::clone(&system));
                let outcome = AssertUnwindSafe(actor.on_envelope(&ctx, &envelope))
                    .catch_unwind()
                    .await;
                report(&self_ref, envelope.payload_type_name(), outcome);
            }
            MailboxItem::Activate => {
                let ctx = ActorContext::new(self_ref.clone(), None, Arc::clone(&system));
                let outcome = AssertUnwindSafe(actor.post_activate(&ctx)).catch_unwind().await;
                report(&self_ref, "post_activate", outcome);
            }
            MailboxItem::Stop => {
                let ctx = ActorContext::new(self_ref.clone(), None, Arc::clone(&system));
                let outcome = AssertUnwindSafe(actor.pre_destroy(&ctx)).catch_unwind().await;
                report(&self_ref, "pre_destroy", outcome);
                break;
            }
        }
    }
    trace!("mailbox stopped");
}

fn report(
    self_ref: &ActorRef,
    handling: &str,
    outcome: Result<anyhow::Result<()>, Box<dyn std::any::Any + Send>>,
) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(actor = %self_ref, handling, error = %e, "Actor handler failed"),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            error!(actor = %self_ref, handling, reason, "Actor handler panicked");
        }
    }
}
