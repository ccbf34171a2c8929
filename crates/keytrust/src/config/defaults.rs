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

use crate::config::types::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_KEY_COMMAND_TEMPLATE: &str =
    "{{.AppPath}} --config={{.CustomConf}} serv key-{{.Key.ID}}";

/// Default minimum key sizes. DSA is absent and therefore rejected.
pub fn default_minimum_key_sizes() -> BTreeMap<String, i32> {
    let mut sizes = BTreeMap::new();
    sizes.insert("ed25519".to_string(), 256);
    sizes.insert("ed25519-sk".to_string(), 256);
    sizes.insert("ecdsa".to_string(), 256);
    sizes.insert("ecdsa-sk".to_string(), 256);
    sizes.insert("rsa".to_string(), 3071);
    sizes
}

impl Default for AppConfig {
    fn default() -> Self {
        let app_path = std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "keytrust".to_string());
        Self {
            name: "Gitea".to_string(),
            app_path,
            work_path: String::new(),
            custom_path: String::new(),
            custom_conf: "custom/conf/app.ini".to_string(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        let root_path = dirs::home_dir()
            .map(|home| home.join(".ssh"))
            .unwrap_or_else(|| PathBuf::from(".ssh"));
        Self {
            disabled: false,
            start_builtin_server: false,
            root_path,
            create_authorized_keys_file: true,
            create_authorized_principals_file: true,
            authorized_keys_backup: true,
            authorized_keys_command_template: DEFAULT_KEY_COMMAND_TEMPLATE.to_string(),
            minimum_key_size_check: true,
            minimum_key_sizes: default_minimum_key_sizes(),
            keygen_path: "ssh-keygen".to_string(),
            key_test_path: std::env::temp_dir(),
            authorized_principals_allow: vec!["email".to_string(), "username".to_string()],
            trusted_user_ca_keys: Vec::new(),
        }
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            signing_key: "default".to_string(),
            signing_name: String::new(),
            signing_email: String::new(),
            public_key_path: None,
            gpg_program: "gpg".to_string(),
            trusted_ssh_keys: Vec::new(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            no_reply_address: "noreply.localhost".to_string(),
            verification_token_minutes: 1,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "${KEYTRUST_DATABASE_URL:-/var/lib/keytrust/keytrust.db}".to_string(),
            pool_size: 4,
        }
    }
}
