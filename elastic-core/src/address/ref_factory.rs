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

use std::sync::Weak;

use crate::address::{parse_spec, ActorRef};
use crate::common::ElasticError;
use crate::traits::{ActorRefFactory, MessageRouter};

/// Parses spec strings relative to a local cluster.
///
/// Specs naming any other cluster become remote refs.
#[derive(Debug, Clone)]
pub struct ActorRefParser {
    local_cluster: String,
    router: Option<Weak<dyn MessageRouter>>,
}

impl ActorRefParser {
    pub fn new(local_cluster: impl Into<String>, router: Weak<dyn MessageRouter>) -> Self {
        Self {
            local_cluster: local_cluster.into(),
            router: Some(router),
        }
    }

    /// A parser whose refs are not bound to any router.
    pub fn detached(local_cluster: impl Into<String>) -> Self {
        Self {
            local_cluster: local_cluster.into(),
            router: None,
        }
    }

    #[must_use]
    pub fn local_cluster(&self) -> &str {
        &self.local_cluster
    }
}

impl ActorRefFactory for ActorRefParser {
    fn create(&self, spec: &str) -> Result<ActorRef, ElasticError> {
        let (cluster, path) = parse_spec(spec)?;
        let remote = cluster != self.local_cluster;
        ActorRef::new(cluster, path, remote, self.router.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ActorRefKind;

    #[test]
    fn parsed_refs_equal_constructed_refs() {
        let parser = ActorRefParser::detached("local");
        for spec in [
            "actor://local/orders/shards/4/order-9",
            "actor://local/orders/nodes/n1",
            "actor://local/orders/nodes/n1/tmp-1",
            "actor://local/orders/nodes/n1/services/clock",
            "actor://eu/orders/shards/0/a/b",
        ] {
            let parsed = parser.create(spec).unwrap();
            assert_eq!(parsed.spec(), spec);
            assert_eq!(parser.create(parsed.spec()).unwrap(), parsed);
        }
    }

    #[test]
    fn foreign_clusters_are_remote() {
        let parser = ActorRefParser::detached("local");
        let remote = parser.create("actor://eu/orders/nodes/n1/services/clock").unwrap();
        assert_eq!(remote.kind(), ActorRefKind::RemoteCluster);
        assert_eq!(remote.cluster(), "eu");
    }
}
