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
#![forbid(unsafe_code)]

//! Test harness for Elastic actor code.
//!
//! ```ignore
//! use elastic_test::prelude::*;
//!
//! #[elastic_test]
//! async fn echo_replies() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```
//!
//! A panic inside any task spawned while the test runs fails the test, even when
//! nothing awaits that task.

pub use elastic_test_macro::elastic_test;

/// Everything a test module usually needs.
pub mod prelude {
    pub use elastic_test_macro::elastic_test;
}

/// Support for the `#[elastic_test]` expansion.
#[doc(hidden)]
pub mod __private {
    use std::any::Any;
    use std::fmt::Debug;

    pub use parking_lot;
    pub use tokio;
    pub use tracing;

    /// Text of a panic payload raised with a string literal or a formatted message.
    #[must_use]
    pub fn panic_message(payload: &(dyn Any + Send)) -> String {
        payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .map_or_else(|| "non-string panic payload".to_owned(), |m| m.trim().replace('\n', " "))
    }

    /// What an `#[elastic_test]` body may return.
    pub trait TestOutcome {
        fn conclude(self);
    }

    impl TestOutcome for () {
        fn conclude(self) {}
    }

    impl<E: Debug> TestOutcome for Result<(), E> {
        fn conclude(self) {
            if let Err(e) = self {
                panic!("test returned an error: {e:?}");
            }
        }
    }
}
