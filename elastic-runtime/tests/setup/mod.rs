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
use std::sync::Once;
use std::time::Duration;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use elastic_runtime::common::{ActorSystemConfig, ElasticConfig};

pub mod actors;
pub mod messages;

pub use actors::*;
pub use messages::*;

static INIT: Once = Once::new();

/// Sends test logs to `logs/elastic_tests.txt`, once per test binary.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "elastic_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // keep the writer alive until exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("info")
            .add_directive("elastic_runtime::scheduler=trace".parse().unwrap())
            .add_directive("elastic_runtime::events=trace".parse().unwrap())
            .add_directive("elastic_runtime::actor=debug".parse().unwrap())
            .add_directive("elastic_runtime::common=debug".parse().unwrap())
            .add_directive("elastic_core=debug".parse().unwrap())
            .add_directive("tokio=info".parse().unwrap());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
    });
}

pub const SYSTEM: &str = "test";
pub const SHARDS: u32 = 4;

/// One actor system named [`SYSTEM`] with [`SHARDS`] shards in `cluster`.
pub fn test_config(cluster: &str) -> ElasticConfig {
    let mut config = ElasticConfig::default();
    config.cluster.cluster_name = cluster.to_string();
    config.cluster.node_id = format!("{cluster}-node");
    config.actor_systems = vec![ActorSystemConfig {
        name: SYSTEM.to_string(),
        shards: SHARDS,
    }];
    config.timeouts.system_shutdown_ms = 2_000;
    config
}

/// Polls `condition` every 10ms until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Like [`eventually`], for async conditions.
pub async fn eventually_async<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
