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

//! The `actor://` ref-spec grammar.
//!
//! ```text
//! actor://{cluster}/{system}/shards/{shardId}/{actorId}
//! actor://{cluster}/{system}/nodes/{nodeId}
//! actor://{cluster}/{system}/nodes/{nodeId}/{actorId}
//! actor://{cluster}/{system}/nodes/{nodeId}/services/{serviceId}
//! ```
//!
//! Shard and node actor ids take the remainder of the string and may contain `/`.
//! Node actor ids may not start with `services/`, that prefix addresses service actors.

use crate::address::{NodeKey, ShardKey};
use crate::common::ElasticError;

/// Scheme prefix of every actor ref spec.
pub const ACTOR_SCHEME: &str = "actor://";

/// Reserved node actor-id namespace for service actors.
pub const SERVICES_NAMESPACE: &str = "services/";

const SHARDS: &str = "shards";
const NODES: &str = "nodes";

/// Where an actor lives inside its cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorPath {
    /// A persistent actor partitioned onto a shard.
    Shard { shard: ShardKey, actor_id: String },
    /// A node-local actor, or the node itself when `actor_id` is absent.
    Node {
        node: NodeKey,
        actor_id: Option<String>,
    },
    /// A service actor hosted by a node.
    Service { node: NodeKey, service_id: String },
}

impl ActorPath {
    #[must_use]
    pub fn actor_system(&self) -> &str {
        match self {
            Self::Shard { shard, .. } => shard.actor_system(),
            Self::Node { node, .. } | Self::Service { node, .. } => node.actor_system(),
        }
    }

    /// The actor id, or the service id for service actors.
    #[must_use]
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            Self::Shard { actor_id, .. } => Some(actor_id),
            Self::Node { actor_id, .. } => actor_id.as_deref(),
            Self::Service { service_id, .. } => Some(service_id),
        }
    }

    /// Key identifying the actor inside its container.
    ///
    /// Services live in the same node container as temporary actors, so their keys
    /// keep the reserved namespace prefix. The node itself has the empty key.
    #[must_use]
    pub fn local_key(&self) -> String {
        match self {
            Self::Shard { actor_id, .. } => actor_id.clone(),
            Self::Node { actor_id, .. } => actor_id.clone().unwrap_or_default(),
            Self::Service { service_id, .. } => format!("{SERVICES_NAMESPACE}{service_id}"),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ElasticError> {
        segment("actor system", self.actor_system())?;
        match self {
            Self::Shard { actor_id, .. } => non_empty("actor id", actor_id),
            Self::Node { node, actor_id } => {
                segment("node id", node.node_id())?;
                match actor_id {
                    Some(id) if id.starts_with(SERVICES_NAMESPACE) => Err(ElasticError::Addressing(
                        format!("node actor id '{id}' uses the reserved '{SERVICES_NAMESPACE}' namespace"),
                    )),
                    Some(id) => non_empty("actor id", id),
                    None => Ok(()),
                }
            }
            Self::Service { node, service_id } => {
                segment("node id", node.node_id())?;
                non_empty("service id", service_id)
            }
        }
    }
}

pub(crate) fn segment(what: &str, value: &str) -> Result<(), ElasticError> {
    non_empty(what, value)?;
    if value.contains('/') {
        return Err(ElasticError::Addressing(format!("{what} '{value}' must not contain '/'")));
    }
    Ok(())
}

fn non_empty(what: &str, value: &str) -> Result<(), ElasticError> {
    if value.is_empty() {
        return Err(ElasticError::Addressing(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Formats the canonical spec string for `path` inside `cluster`.
#[must_use]
pub fn generate_spec(cluster: &str, path: &ActorPath) -> String {
    match path {
        ActorPath::Shard { shard, actor_id } => format!(
            "{ACTOR_SCHEME}{cluster}/{}/{SHARDS}/{}/{actor_id}",
            shard.actor_system(),
            shard.shard_id()
        ),
        ActorPath::Node { node, actor_id: None } => format!(
            "{ACTOR_SCHEME}{cluster}/{}/{NODES}/{}",
            node.actor_system(),
            node.node_id()
        ),
        ActorPath::Node {
            node,
            actor_id: Some(actor_id),
        } => format!(
            "{ACTOR_SCHEME}{cluster}/{}/{NODES}/{}/{actor_id}",
            node.actor_system(),
            node.node_id()
        ),
        ActorPath::Service { node, service_id } => format!(
            "{ACTOR_SCHEME}{cluster}/{}/{NODES}/{}/{SERVICES_NAMESPACE}{service_id}",
            node.actor_system(),
            node.node_id()
        ),
    }
}

/// Parses a spec string into its cluster name and path.
///
/// # Errors
///
/// Returns [`ElasticError::Addressing`] when the scheme, the locality kind, the shard
/// number or any required segment is missing or malformed.
pub fn parse_spec(spec: &str) -> Result<(String, ActorPath), ElasticError> {
    let malformed = |reason: &str| ElasticError::Addressing(format!("invalid actor spec '{spec}': {reason}"));

    let rest = spec
        .strip_prefix(ACTOR_SCHEME)
        .ok_or_else(|| malformed("missing actor:// scheme"))?;

    let mut parts = rest.splitn(4, '/');
    let cluster = parts.next().unwrap_or_default();
    let system = parts.next().ok_or_else(|| malformed("missing actor system"))?;
    let kind = parts.next().ok_or_else(|| malformed("missing locality"))?;
    let tail = parts.next().ok_or_else(|| malformed("missing locality id"))?;

    segment("cluster", cluster).map_err(|_| malformed("empty cluster"))?;
    segment("actor system", system).map_err(|_| malformed("empty actor system"))?;

    let path = match kind {
        SHARDS => {
            let (shard_id, actor_id) = tail
                .split_once('/')
                .ok_or_else(|| malformed("shard refs need an actor id"))?;
            let shard_id = shard_id
                .parse::<u32>()
                .map_err(|_| malformed("shard id is not a number"))?;
            ActorPath::Shard {
                shard: ShardKey::new(system, shard_id),
                actor_id: actor_id.to_string(),
            }
        }
        NODES => {
            let (node_id, remainder) = match tail.split_once('/') {
                Some((node_id, remainder)) => (node_id, Some(remainder)),
                None => (tail, None),
            };
            let node = NodeKey::new(system, node_id);
            match remainder {
                Some(r) => match r.strip_prefix(SERVICES_NAMESPACE) {
                    Some(service_id) => ActorPath::Service {
                        node,
                        service_id: service_id.to_string(),
                    },
                    None => ActorPath::Node {
                        node,
                        actor_id: Some(r.to_string()),
                    },
                },
                None => ActorPath::Node { node, actor_id: None },
            }
        }
        other => return Err(malformed(&format!("unknown locality '{other}'"))),
    };

    path.validate().map_err(|e| malformed(&e.to_string()))?;
    Ok((cluster.to_string(), path))
}
