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

use std::fmt;

/// Errors raised by the Elastic actor runtime.
///
/// Addressing and precondition errors are returned synchronously to the caller that
/// misused an API. Errors inside asynchronous delivery paths (timer firing, event
/// dispatch, best-effort `tell`) are logged where they occur and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElasticError {
    /// A ref-spec string could not be parsed, or a ref of the wrong kind was passed to
    /// an operation that requires a specific kind.
    Addressing(String),

    /// Envelope or payload encoding failed, or no codec exists for a message type.
    Serialization(String),

    /// The sender passed to `schedule_once` is not a locally owned persistent shard
    /// actor. Contains the offending ref spec.
    SchedulingPrecondition(String),

    /// The addressed container or transport could not accept the message.
    Delivery(String),

    /// An operation was invoked outside the context it requires.
    IllegalState(String),

    /// An `ask` received a reply whose type tag differs from the expected one.
    UnexpectedResponse {
        /// Type tag the caller asked for.
        expected: String,
        /// Type tag that actually arrived.
        actual: String,
    },

    /// The target of an `ask` did not exist; the request bounced back.
    Undeliverable(String),

    /// A backing repository failed.
    Repository(String),
}

impl fmt::Display for ElasticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addressing(e) => write!(f, "Addressing error: {e}"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::SchedulingPrecondition(r) => write!(
                f,
                "sender ref: {r} needs to be a non-temp, non-service, locally sharded actor ref"
            ),
            Self::Delivery(e) => write!(f, "Delivery failure: {e}"),
            Self::IllegalState(e) => write!(f, "Illegal state: {e}"),
            Self::UnexpectedResponse { expected, actual } => {
                write!(f, "Unexpected response type: expected {expected}, got {actual}")
            }
            Self::Undeliverable(r) => write!(f, "Message undeliverable to {r}"),
            Self::Repository(e) => write!(f, "Repository error: {e}"),
        }
    }
}

impl std::error::Error for ElasticError {}

impl From<serde_json::Error> for ElasticError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<uuid::Error> for ElasticError {
    fn from(err: uuid::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::str::Utf8Error> for ElasticError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_error_names_offending_ref() {
        let err = ElasticError::SchedulingPrecondition("actor://c/s/nodes/n/tmp".into());
        assert!(err.to_string().contains("actor://c/s/nodes/n/tmp"));
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let err: ElasticError = serde_json::from_slice::<u32>(b"nope").unwrap_err().into();
        assert!(matches!(err, ElasticError::Serialization(_)));
    }
}
