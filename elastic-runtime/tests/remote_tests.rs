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

use bytes::Bytes;
use parking_lot::Mutex;

use elastic_runtime::common::{ElasticConfig, RemoteActorSystemConfig};
use elastic_runtime::prelude::*;
use elastic_test::prelude::*;

use crate::setup::*;

mod setup;

/// Hands envelopes straight to another in-process runtime.
#[derive(Default)]
struct Loopback {
    peer: Mutex<Option<ElasticRuntime>>,
    sent: Mutex<usize>,
}

impl RemoteClusterTransport for Loopback {
    fn send(&self, cluster: &str, envelope: Bytes) -> Result<(), ElasticError> {
        let peer = self
            .peer
            .lock()
            .clone()
            .ok_or_else(|| ElasticError::Delivery(format!("no peer for {cluster}")))?;
        *self.sent.lock() += 1;
        peer.deliver_encoded(&envelope)
    }
}

fn config_with_remote(cluster: &str, remote: &str) -> ElasticConfig {
    let mut config = test_config(cluster);
    config.remote_actor_systems = vec![RemoteActorSystemConfig {
        cluster_name: remote.to_string(),
        name: SYSTEM.to_string(),
        shards: SHARDS,
    }];
    config
}

async fn linked_pair() -> anyhow::Result<(ElasticRuntime, ElasticRuntime, Arc<Loopback>, Arc<Loopback>)> {
    let alpha = ElasticApp::launch_with_config(config_with_remote("alpha", "beta")).await?;
    let beta = ElasticApp::launch_with_config(config_with_remote("beta", "alpha")).await?;
    for runtime in [&alpha, &beta] {
        register_messages(runtime);
        let system = runtime.actor_system(SYSTEM).expect("test system is configured");
        register_actor_types(&system, &Journal::default());
    }

    let to_beta = Arc::new(Loopback::default());
    *to_beta.peer.lock() = Some(beta.clone());
    alpha.register_remote_cluster("beta", to_beta.clone());

    let to_alpha = Arc::new(Loopback::default());
    *to_alpha.peer.lock() = Some(alpha.clone());
    beta.register_remote_cluster("alpha", to_alpha.clone());

    Ok((alpha, beta, to_beta, to_alpha))
}

fn unlink(links: [&Loopback; 2]) {
    for link in links {
        link.peer.lock().take();
    }
}

#[elastic_test]
async fn ask_crosses_clusters_and_reply_comes_back() -> anyhow::Result<()> {
    initialize_tracing();
    let (alpha, beta, to_beta, to_alpha) = linked_pair().await?;

    let beta_system = beta.actor_system(SYSTEM).expect("test system is configured");
    let local_echo = beta_system.actor_of("echo-remote", ECHO, None)?;

    let remote_echo = alpha.remote_actor_for("beta", SYSTEM, "echo-remote")?;
    assert!(remote_echo.is_remote());
    assert_eq!(remote_echo.spec(), local_echo.spec());

    let reply: Echoed = remote_echo
        .ask(Greeting {
            text: "across".to_string(),
        })
        .await?;
    assert_eq!(reply.text, "across");
    assert_eq!(*to_beta.sent.lock(), 1);
    assert_eq!(*to_alpha.sent.lock(), 1);

    unlink([to_beta.as_ref(), to_alpha.as_ref()]);
    alpha.shutdown().await?;
    beta.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn missing_remote_actor_bounces_back_to_the_asker() -> anyhow::Result<()> {
    initialize_tracing();
    let (alpha, beta, to_beta, to_alpha) = linked_pair().await?;

    let ghost = alpha.remote_actor_for("beta", SYSTEM, "ghost")?;
    let result = ghost.ask::<Greeting, Echoed>(Greeting { text: "hello?".to_string() }).await;
    assert!(
        matches!(&result, Err(ElasticError::Undeliverable(target)) if target == ghost.spec()),
        "unexpected result {result:?}"
    );

    unlink([to_beta.as_ref(), to_alpha.as_ref()]);
    alpha.shutdown().await?;
    beta.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn unlinked_cluster_is_a_delivery_error() -> anyhow::Result<()> {
    initialize_tracing();
    let alpha = ElasticApp::launch_with_config(config_with_remote("alpha-solo", "beta")).await?;
    register_messages(&alpha);

    let remote = alpha.remote_actor_for("beta", SYSTEM, "anyone")?;
    let payload = MessagePayload::from_message(&Greeting { text: "hi".to_string() })?;
    assert!(matches!(remote.try_tell_payload(payload, None), Err(ElasticError::Delivery(_))));

    assert!(matches!(alpha.deliver_encoded(b"\x02garbage"), Err(ElasticError::Serialization(_))));

    alpha.shutdown().await?;
    Ok(())
}
