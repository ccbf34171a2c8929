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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTrustConfig {
    pub app: AppConfig,
    pub ssh: SshConfig,
    pub signing: SigningConfig,
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
}

/// Installation paths substituted into the forced command of each
/// authorized-keys stanza.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub app_path: String,
    pub work_path: String,
    pub custom_path: String,
    pub custom_conf: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub disabled: bool,
    /// When set, the embedded SSH server is in use: the authorized-keys
    /// files are not managed and keys are inspected natively.
    pub start_builtin_server: bool,
    pub root_path: PathBuf,
    pub create_authorized_keys_file: bool,
    pub create_authorized_principals_file: bool,
    pub authorized_keys_backup: bool,
    pub authorized_keys_command_template: String,
    pub minimum_key_size_check: bool,
    /// Minimum bit length per algorithm. -1 disables the algorithm; an
    /// algorithm missing from the map is not allowed.
    pub minimum_key_sizes: BTreeMap<String, i32>,
    pub keygen_path: String,
    pub key_test_path: PathBuf,
    /// Which principals a user may register: `anything`, `email`, `username`, `off`.
    pub authorized_principals_allow: Vec<String>,
    pub trusted_user_ca_keys: Vec<String>,
}

impl SshConfig {
    pub fn keys_file(&self) -> PathBuf {
        self.root_path.join("authorized_keys")
    }

    pub fn principals_file(&self) -> PathBuf {
        self.root_path.join("authorized_principals")
    }
}

/// The installation-wide signing identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// A key id, `default` (whatever gpg picks) or `none`.
    pub signing_key: String,
    pub signing_name: String,
    pub signing_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_path: Option<PathBuf>,
    pub gpg_program: String,
    /// OpenSSH public keys whose signatures are attributed to the instance signer.
    pub trusted_ssh_keys: Vec<String>,
}

impl SigningConfig {
    pub fn is_enabled(&self) -> bool {
        !self.signing_key.is_empty() && self.signing_key != "none"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub no_reply_address: String,
    /// Minutes an ownership-proof token stays valid after it is issued.
    pub verification_token_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}
