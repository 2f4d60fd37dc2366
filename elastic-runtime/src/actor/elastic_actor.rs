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

use async_trait::async_trait;
use tracing::warn;

use elastic_core::address::ActorRef;
use elastic_core::message::InternalMessage;
use elastic_core::traits::AnyMessage;

use crate::actor::ActorContext;

/// Builds an actor instance for an actor id and optional initial state.
pub type ActorFactory =
    Arc<dyn Fn(&str, Option<&[u8]>) -> anyhow::Result<Box<dyn ElasticActor>> + Send + Sync>;

/// Behaviour of an actor hosted by the runtime.
///
/// Each actor processes one envelope at a time; distinct actors run in parallel.
/// Errors returned from a handler are logged and the actor keeps running.
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl ElasticActor for Echo {
///     async fn on_receive(&mut self, ctx: &ActorContext, message: Box<dyn AnyMessage>) -> anyhow::Result<()> {
///         if let Some(greeting) = message.downcast_ref::<Greeting>() {
///             ctx.reply(greeting.clone())?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ElasticActor: Send + 'static {
    /// Handles an application message.
    async fn on_receive(&mut self, ctx: &ActorContext, message: Box<dyn AnyMessage>) -> anyhow::Result<()>;

    /// Handles a message this actor sent that could not be delivered to `receiver`.
    async fn on_undeliverable(
        &mut self,
        ctx: &ActorContext,
        receiver: &ActorRef,
        message: Box<dyn AnyMessage>,
    ) -> anyhow::Result<()> {
        warn!(
            actor = %ctx.self_ref(),
            %receiver,
            message_type = message.type_name(),
            "message was undeliverable"
        );
        Ok(())
    }

    /// Entry point for every envelope. Decodes the payload through the runtime's
    /// codecs and dispatches to [`on_receive`](Self::on_receive) or
    /// [`on_undeliverable`](Self::on_undeliverable).
    async fn on_envelope(&mut self, ctx: &ActorContext, envelope: &InternalMessage) -> anyhow::Result<()> {
        let message = ctx
            .codecs()
            .deserialize(envelope.payload_type_name(), envelope.payload())?;
        match (envelope.is_undeliverable(), envelope.sender()) {
            (true, Some(receiver)) => self.on_undeliverable(ctx, receiver, message).await,
            _ => self.on_receive(ctx, message).await,
        }
    }

    /// Called when the actor is activated.
    async fn post_activate(&mut self, _ctx: &ActorContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once before the actor is removed.
    async fn pre_destroy(&mut self, _ctx: &ActorContext) -> anyhow::Result<()> {
        Ok(())
    }
}
