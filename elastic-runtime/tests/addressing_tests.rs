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

use elastic_runtime::prelude::*;
use elastic_test::prelude::*;

use crate::setup::*;

mod setup;

#[elastic_test]
async fn refs_print_and_parse_to_the_same_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ElasticApp::launch_with_config(test_config("addressing")).await?;
    let system = runtime.actor_system(SYSTEM).expect("test system is configured");

    let actor = system.actor_for("orders/42")?;
    let shard = system.shard_for("orders/42");
    assert_eq!(
        actor.spec(),
        format!("actor://addressing/test/shards/{}/orders/42", shard.shard_id())
    );
    assert_eq!(actor.kind(), ActorRefKind::PersistentShard);
    assert_eq!(runtime.actor_ref(actor.spec())?, actor);

    let service = system.service_actor_for("clock")?;
    assert_eq!(service.spec(), "actor://addressing/test/nodes/addressing-node/services/clock");
    assert_eq!(runtime.actor_ref(service.spec())?.kind(), ActorRefKind::Service);

    let node = system.node_ref()?;
    assert_eq!(node.spec(), "actor://addressing/test/nodes/addressing-node");
    assert_eq!(node.kind(), ActorRefKind::LocalNode);

    let remote = runtime.actor_ref("actor://elsewhere/test/shards/0/someone")?;
    assert!(remote.is_remote());
    assert_eq!(remote.kind(), ActorRefKind::RemoteCluster);

    assert!(matches!(runtime.actor_ref("actor://addressing/test"), Err(ElasticError::Addressing(_))));
    assert!(matches!(runtime.actor_ref("http://addressing/test/shards/0/x"), Err(ElasticError::Addressing(_))));

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn tell_from_outside_an_actor_needs_a_sender() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ElasticApp::launch_with_config(test_config("addressing-tell")).await?;
    register_messages(&runtime);
    let system = runtime.actor_system(SYSTEM).expect("test system is configured");
    register_actor_types(&system, &Journal::default());
    let echo = system.actor_of("echo", ECHO, None)?;

    let result = echo.tell_from(Greeting { text: "hi".to_string() }, &runtime);
    assert!(matches!(result, Err(ElasticError::IllegalState(_))));

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn released_shards_refuse_messages() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ElasticApp::launch_with_config(test_config("addressing-owned")).await?;
    register_messages(&runtime);
    let system = runtime.actor_system(SYSTEM).expect("test system is configured");
    register_actor_types(&system, &Journal::default());

    let shard = system.shard_for("parked");
    runtime.release_shard(SYSTEM, shard.shard_id()).await?;

    assert!(matches!(
        system.actor_of("parked", ECHO, None),
        Err(ElasticError::Delivery(_))
    ));
    let parked = system.actor_for("parked")?;
    let payload = MessagePayload::from_message(&Greeting { text: "hi".to_string() })?;
    assert!(matches!(parked.try_tell_payload(payload, None), Err(ElasticError::Delivery(_))));

    runtime.acquire_shard(SYSTEM, shard.shard_id()).await?;
    let echo = system.actor_of("parked", ECHO, None)?;
    let reply: Echoed = echo.ask(Greeting { text: "back".to_string() }).await?;
    assert_eq!(reply.text, "back");

    runtime.shutdown().await?;
    Ok(())
}

#[elastic_test]
async fn unknown_actor_types_and_remote_systems_are_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ElasticApp::launch_with_config(test_config("addressing-unknown")).await?;
    let system = runtime.actor_system(SYSTEM).expect("test system is configured");

    assert!(matches!(
        system.actor_of("who", "test.NotRegistered", None),
        Err(ElasticError::IllegalState(_))
    ));
    assert!(matches!(
        runtime.remote_actor_for("elsewhere", SYSTEM, "who"),
        Err(ElasticError::Addressing(_))
    ));
    assert!(runtime.actor_system("missing").is_none());
    assert!(matches!(
        runtime.acquire_shard(SYSTEM, SHARDS).await,
        Err(ElasticError::Addressing(_))
    ));

    runtime.shutdown().await?;
    Ok(())
}
