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

pub use config::{
    ActorSystemConfig, ClusterConfig, ElasticConfig, RemoteActorSystemConfig, SchedulerConfig, TimeoutConfig, CONFIG,
};
pub use elastic_app::ElasticApp;
pub use runtime::ElasticRuntime;
pub use transport::RemoteClusterTransport;

pub(crate) use cluster_router::ClusterRouter;

mod cluster_router;
/// Runtime configuration loaded from TOML.
mod config;
mod elastic_app;
mod runtime;
mod transport;
