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

use bytes::Bytes;

use elastic_core::common::ElasticError;

/// Outbound link to a remote cluster.
///
/// Receives fully encoded envelopes; the other side hands them to
/// [`ElasticRuntime::deliver_encoded`](crate::common::ElasticRuntime::deliver_encoded).
pub trait RemoteClusterTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ElasticError::Delivery`] when the envelope cannot be handed off.
    fn send(&self, cluster: &str, envelope: Bytes) -> Result<(), ElasticError>;
}
