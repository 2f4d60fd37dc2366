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

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::trace;

use elastic_core::common::ElasticError;
use elastic_core::message::InternalMessage;
use elastic_core::traits::AnyMessage;

use crate::actor::{ActorContext, ElasticActor};

pub(crate) type ReplySender = oneshot::Sender<Result<InternalMessage, ElasticError>>;

/// Temp actor standing in as the sender of an ask.
///
/// Completes the ask with the first envelope it receives and then destroys itself.
/// A bounced request completes it with [`ElasticError::Undeliverable`].
pub(crate) struct ReplyActor {
    reply: Option<ReplySender>,
}

impl ReplyActor {
    pub(crate) const fn new(reply: ReplySender) -> Self {
        Self { reply: Some(reply) }
    }
}

#[async_trait]
impl ElasticActor for ReplyActor {
    async fn on_receive(&mut self, _ctx: &ActorContext, _message: Box<dyn AnyMessage>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_envelope(&mut self, ctx: &ActorContext, envelope: &InternalMessage) -> anyhow::Result<()> {
        if let Some(reply) = self.reply.take() {
            let outcome = if envelope.is_undeliverable() {
                let target = envelope
                    .sender()
                    .map_or_else(|| "unknown receiver".to_owned(), ToString::to_string);
                Err(ElasticError::Undeliverable(target))
            } else {
                Ok(envelope.clone())
            };
            if reply.send(outcome).is_err() {
                trace!(actor = %ctx.self_ref(), "ask abandoned before the reply arrived");
            }
        }
        ctx.stop_self();
        Ok(())
    }
}
