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
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use elastic_runtime::prelude::*;

use crate::setup::messages::*;

pub const ECHO: &str = "test.Echo";
pub const MIRROR: &str = "test.Mirror";
pub const SHRUGGER: &str = "test.Shrugger";
pub const RELAY: &str = "test.Relay";
pub const RECORDER: &str = "test.Recorder";

/// Something a recording actor saw.
#[derive(Debug, Clone)]
pub struct Observed {
    pub actor_id: String,
    pub message_type: String,
    pub detail: String,
    pub received_at: DateTime<Utc>,
}

/// Shared log written by recording actors.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Observed>>>);

impl Journal {
    fn record(&self, actor_id: &str, message_type: &str, detail: String) {
        self.0.lock().push(Observed {
            actor_id: actor_id.to_string(),
            message_type: message_type.to_string(),
            detail,
            received_at: Utc::now(),
        });
    }

    pub fn snapshot(&self) -> Vec<Observed> {
        self.0.lock().clone()
    }

    pub fn count(&self, actor_id: &str, message_type: &str) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|o| o.actor_id == actor_id && o.message_type == message_type)
            .count()
    }
}

/// Replies to every [`Greeting`] and [`Ping`] with an [`Echoed`] of the same text.
pub struct EchoActor;

#[async_trait]
impl ElasticActor for EchoActor {
    async fn on_receive(&mut self, ctx: &ActorContext, message: Box<dyn AnyMessage>) -> anyhow::Result<()> {
        if let Some(greeting) = message.downcast_ref::<Greeting>() {
            ctx.reply(Echoed {
                text: greeting.text.clone(),
            })?;
        } else if let Some(ping) = message.downcast_ref::<Ping>() {
            ctx.reply(Echoed { text: ping.text.clone() })?;
        }
        Ok(())
    }
}

/// Replies to every [`Greeting`] with the same greeting.
pub struct MirrorActor;

#[async_trait]
impl ElasticActor for MirrorActor {
    async fn on_receive(&mut self, ctx: &ActorContext, message: Box<dyn AnyMessage>) -> anyhow::Result<()> {
        if let Some(greeting) = message.downcast_ref::<Greeting>() {
            ctx.reply(greeting.clone())?;
        }
        Ok(())
    }
}

/// Replies to anything with a [`Shrug`].
pub struct ShrugActor;

#[async_trait]
impl ElasticActor for ShrugActor {
    async fn on_receive(&mut self, ctx: &ActorContext, _message: Box<dyn AnyMessage>) -> anyhow::Result<()> {
        ctx.reply(Shrug)?;
        Ok(())
    }
}

/// Forwards a [`Greeting`] to `target` as a [`Ping`] and replies with the answer.
///
/// Answers a [`Ping`] itself, so a relay may target its own id.
pub struct RelayActor {
    target: String,
}

#[async_trait]
impl ElasticActor for RelayActor {
    async fn on_receive(&mut self, ctx: &ActorContext, message: Box<dyn AnyMessage>) -> anyhow::Result<()> {
        if let Some(greeting) = message.downcast_ref::<Greeting>() {
            let target = ctx.actor_for(&self.target)?;
            let answer = ctx.ask::<Ping, Echoed>(
                &target,
                Ping {
                    text: greeting.text.clone(),
                },
            );
            let reply = ctx.reply_handle();
            ctx.spawn(async move {
                match answer.await {
                    Ok(echoed) => {
                        let relayed = Echoed {
                            text: format!("relayed {}", echoed.text),
                        };
                        if let Err(e) = reply.reply(relayed) {
                            debug!(error = %e, "relay had nobody to answer");
                        }
                    }
                    Err(e) => debug!(error = %e, "relayed ask failed"),
                }
            });
        } else if let Some(ping) = message.downcast_ref::<Ping>() {
            ctx.reply(Echoed { text: ping.text.clone() })?;
        }
        Ok(())
    }
}

/// Records ticks and shard events, and schedules or subscribes on request.
pub struct RecordingActor {
    actor_id: String,
    journal: Journal,
}

#[async_trait]
impl ElasticActor for RecordingActor {
    async fn on_receive(&mut self, ctx: &ActorContext, message: Box<dyn AnyMessage>) -> anyhow::Result<()> {
        if let Some(tick) = message.downcast_ref::<Tick>() {
            self.journal.record(&self.actor_id, Tick::TYPE_NAME, tick.seq.to_string());
        } else if let Some(event) = message.downcast_ref::<ShardEvent>() {
            self.journal
                .record(&self.actor_id, ShardEvent::TYPE_NAME, event.marker.clone());
        } else if let Some(request) = message.downcast_ref::<ScheduleTick>() {
            let scheduled = ctx
                .schedule_once(
                    &Tick { seq: request.seq },
                    ctx.self_ref(),
                    Duration::from_millis(request.delay_ms),
                )
                .await?;
            debug!(%scheduled, "tick scheduled");
            ctx.reply(Scheduled {
                message_ref: scheduled.to_string(),
            })?;
        } else if let Some(request) = message.downcast_ref::<Subscribe>() {
            if request.unsubscribe {
                ctx.deregister_event_listener(request.event).await?;
            } else {
                let event = ShardEvent {
                    marker: request.marker.clone(),
                };
                ctx.register_event_listener(request.event, &event).await?;
            }
            ctx.reply(Subscribed)?;
        }
        Ok(())
    }
}

/// Registers every test actor type with `system`.
pub fn register_actor_types(system: &ActorSystem, journal: &Journal) {
    system.register_actor_type(ECHO, |_, _| Ok(Box::new(EchoActor) as Box<dyn ElasticActor>));
    system.register_actor_type(MIRROR, |_, _| Ok(Box::new(MirrorActor) as Box<dyn ElasticActor>));
    system.register_actor_type(SHRUGGER, |_, _| Ok(Box::new(ShrugActor) as Box<dyn ElasticActor>));
    system.register_actor_type(RELAY, |_, state| {
        let target = String::from_utf8(state.unwrap_or_default().to_vec())?;
        Ok(Box::new(RelayActor { target }) as Box<dyn ElasticActor>)
    });
    let journal = journal.clone();
    system.register_actor_type(RECORDER, move |actor_id, _| {
        Ok(Box::new(RecordingActor {
            actor_id: actor_id.to_string(),
            journal: journal.clone(),
        }) as Box<dyn ElasticActor>)
    });
}
