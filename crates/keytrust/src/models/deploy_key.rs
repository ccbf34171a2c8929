/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use super::AccessMode;
use chrono::{DateTime, Utc};

/// Binding of a Deploy-typed public key to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployKey {
    pub id: i64,
    /// Id of the underlying [`PublicKey`](super::PublicKey).
    pub key_id: i64,
    pub repo_id: i64,
    pub name: String,
    pub fingerprint: String,
    pub mode: AccessMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeployKey {
    pub fn is_read_only(&self) -> bool {
        self.mode == AccessMode::Read
    }
}
