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

use std::time::Duration;

use elastic_runtime::prelude::*;
use elastic_test::prelude::*;

use crate::setup::*;

mod setup;

async fn launch(cluster: &str) -> anyhow::Result<(ElasticRuntime, ActorSystem)> {
    let runtime = ElasticApp::launch_with_config(test_config(cluster)).await?;
    register_messages(&runtime);
    let system = runtime.actor_system(SYSTEM).expect("test system is configured");
    register_actor_types(&system, &Journal::default());
    Ok((runtime, system))
}

#[elastic_test]
async fn ask_returns_the_reply_of_a_shard_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-echo").await?;

    let echo = system.actor_of("echo-1", ECHO, None)?;
    let reply: Echoed = echo
        .ask(Greeting {
            text: "hello".to_string(),
        })
        .await?;
    assert_eq!(reply.text, "hello");

    // the reply actor removes itself after the first reply
    let node = system.node().clone();
    assert!(eventually(Duration::from_secs(2), || node.actor_count() == 0).await);

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn ask_resolves_with_the_same_message_type() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-mirror").await?;

    let mirror = system.actor_of("e", MIRROR, None)?;
    let reply: Greeting = mirror
        .ask(Greeting {
            text: "echo".to_string(),
        })
        .await?;
    assert_eq!(reply.text, "echo");

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn ask_with_wrong_reply_type_fails() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-mismatch").await?;

    let shrugger = system.actor_of("shrugger", SHRUGGER, None)?;
    let result = shrugger
        .ask::<Greeting, Echoed>(Greeting {
            text: "anyone?".to_string(),
        })
        .await;
    match result {
        Err(ElasticError::UnexpectedResponse { expected, actual }) => {
            assert_eq!(expected, "test.Echoed");
            assert_eq!(actual, "test.Shrug");
        }
        other => panic!("expected UnexpectedResponse, got {other:?}"),
    }

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn ask_to_missing_actor_is_undeliverable() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-missing").await?;

    let ghost = system.actor_for("nobody-home")?;
    let result = ghost
        .ask::<Greeting, Echoed>(Greeting {
            text: "hello?".to_string(),
        })
        .await;
    assert!(
        matches!(&result, Err(ElasticError::Undeliverable(target)) if target == ghost.spec()),
        "unexpected result {result:?}"
    );

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn ask_after_stop_is_undeliverable() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-stopped").await?;

    let echo = system.actor_of("short-lived", ECHO, None)?;
    let _: Echoed = echo.ask(Greeting { text: "one".to_string() }).await?;

    system.stop(&echo)?;
    let result = echo.ask::<Greeting, Echoed>(Greeting { text: "two".to_string() }).await;
    assert!(matches!(result, Err(ElasticError::Undeliverable(_))));

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn actors_can_ask_other_actors() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-relay").await?;

    system.actor_of("echo-target", ECHO, None)?;
    let relay = system.actor_of("relay", RELAY, Some(b"echo-target".to_vec()))?;

    let reply: Echoed = relay.ask(Greeting { text: "hi".to_string() }).await?;
    assert_eq!(reply.text, "relayed hi");

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn actor_asking_itself_keeps_its_mailbox_moving() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-self").await?;

    let relay = system.actor_of("loop", RELAY, Some(b"loop".to_vec()))?;
    let reply: Echoed = tokio::time::timeout(
        Duration::from_secs(3),
        relay.ask(Greeting {
            text: "round trip".to_string(),
        }),
    )
    .await??;
    assert_eq!(reply.text, "relayed round trip");

    // still responsive afterwards
    let reply: Echoed = tokio::time::timeout(
        Duration::from_secs(3),
        relay.ask(Ping {
            text: "again".to_string(),
        }),
    )
    .await??;
    assert_eq!(reply.text, "again");

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn abandoned_asks_tear_down_their_reply_actors() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-abandoned").await?;

    // recorders never answer a greeting
    let silent = system.actor_of("silent", RECORDER, None)?;
    let node = system.node().clone();
    let baseline = node.actor_count();

    for i in 0..5 {
        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            silent.ask::<Greeting, Echoed>(Greeting { text: i.to_string() }),
        )
        .await;
        assert!(outcome.is_err(), "silent actor must not answer");
    }

    assert!(eventually(Duration::from_secs(2), || node.actor_count() == baseline).await);

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn temp_actors_and_services_answer_asks() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-node").await?;

    let temp = system.temp_actor_of(ECHO, None)?;
    assert_eq!(temp.kind(), ActorRefKind::LocalNode);
    let reply: Echoed = temp.ask(Greeting { text: "temp".to_string() }).await?;
    assert_eq!(reply.text, "temp");

    let service = system.register_service("echo", EchoActor)?;
    assert_eq!(service.kind(), ActorRefKind::Service);
    assert_eq!(system.service_actor_for("echo")?, service);
    let reply: Echoed = service.ask(Greeting { text: "service".to_string() }).await?;
    assert_eq!(reply.text, "service");

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn asks_run_concurrently() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, system) = launch("ask-many").await?;

    let echo = system.actor_of("busy", ECHO, None)?;
    let asks = (0..32).map(|i| {
        let echo = echo.clone();
        async move { echo.ask::<Greeting, Echoed>(Greeting { text: i.to_string() }).await }
    });
    let replies = futures::future::join_all(asks).await;
    for (i, reply) in replies.into_iter().enumerate() {
        assert_eq!(reply?.text, i.to_string());
    }

    runtime.shutdown().await?;
    Ok(())
}
