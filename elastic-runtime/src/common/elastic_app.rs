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

use tracing::trace;

use elastic_core::common::ElasticError;

use crate::common::{ElasticConfig, ElasticRuntime, CONFIG};
use crate::events::{ActorSystemEventListenerRepository, InMemoryEventListenerRepository};
use crate::scheduler::{InMemoryScheduledMessageRepository, ScheduledMessageRepository};

/// Entry point for starting a runtime.
///
/// # Example
///
/// ```rust,ignore
/// use elastic_runtime::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let runtime = ElasticApp::launch_async().await?;
///     // ...
///     runtime.shutdown().await?;
///     Ok(())
/// }
/// ```
#[derive(Default, Debug, Clone)]
pub struct ElasticApp;

impl ElasticApp {
    /// Launches with the process configuration and in-memory repositories.
    ///
    /// # Errors
    ///
    /// Configuration and startup errors.
    pub async fn launch_async() -> Result<ElasticRuntime, ElasticError> {
        trace!("Starting runtime with loaded configuration");
        Self::launch_with_config(CONFIG.clone()).await
    }

    /// # Errors
    ///
    /// Configuration and startup errors.
    pub async fn launch_with_config(config: ElasticConfig) -> Result<ElasticRuntime, ElasticError> {
        Self::launch_with_repositories(
            config,
            Arc::new(InMemoryScheduledMessageRepository::default()),
            Arc::new(InMemoryEventListenerRepository::default()),
        )
        .await
    }

    /// Launches with caller-supplied persistence, e.g. to restart a node over the
    /// same scheduled messages and listeners.
    ///
    /// # Errors
    ///
    /// Configuration errors and repository errors while loading shard schedules.
    pub async fn launch_with_repositories(
        config: ElasticConfig,
        scheduled_messages: Arc<dyn ScheduledMessageRepository>,
        listeners: Arc<dyn ActorSystemEventListenerRepository>,
    ) -> Result<ElasticRuntime, ElasticError> {
        ElasticRuntime::start(config, scheduled_messages, listeners).await
    }
}
