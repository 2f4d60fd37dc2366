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

use elastic_test::prelude::*;

#[elastic_test]
async fn unit_bodies_pass() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[elastic_test]
async fn ok_results_pass() -> Result<(), String> {
    let joined = tokio::spawn(async { 21 * 2 }).await.map_err(|e| e.to_string())?;
    assert_eq!(joined, 42);
    Ok(())
}
