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

//! SSH certificate principals.

use super::KeyService;
use crate::audit;
use crate::dal::{KeyStoreExt, NewPublicKey};
use crate::error::KeyError;
use crate::models::{AccessMode, KeyType, PublicKey, User};

impl KeyService {
    /// Check that `user` may register `content` as a principal.
    ///
    /// Each entry of `authorized_principals_allow` is tried in turn:
    /// `anything` accepts any principal, `email` one of the user's activated
    /// addresses and `username` the user's name.
    pub fn check_principal_key_string(&self, user: &User, content: &str) -> Result<String, KeyError> {
        let ssh = &self.config.ssh;
        if ssh.disabled {
            return Err(KeyError::SshDisabled);
        }

        let content = content.trim();
        if content.contains(['\r', '\n']) {
            return Err(KeyError::MultipleLines);
        }
        if content.is_empty() {
            return Err(KeyError::InvalidKey("empty principal".to_string()));
        }

        for allowed in &ssh.authorized_principals_allow {
            match allowed.as_str() {
                "anything" => return Ok(content.to_string()),
                "email" => {
                    let emails = self.accounts.email_addresses(user.id)?;
                    if emails.iter().any(|e| e.is_activated && e.email == content) {
                        return Ok(content.to_string());
                    }
                }
                "username" => {
                    if content == user.name {
                        return Ok(content.to_string());
                    }
                }
                _ => {}
            }
        }

        Err(KeyError::PrincipalNotAllowed(
            ssh.authorized_principals_allow.join(","),
        ))
    }

    /// Store a principal for `owner_id` and regenerate the principals file.
    pub fn add_principal_key(
        &self,
        owner_id: i64,
        content: &str,
        login_source_id: i64,
    ) -> Result<PublicKey, KeyError> {
        let key = self.store.write(|q| {
            if q.count_principals(content)? > 0 {
                return Err(KeyError::PrincipalAlreadyExists {
                    content: content.to_string(),
                });
            }
            q.insert_public_key(&NewPublicKey {
                owner_id,
                name: content.to_string(),
                fingerprint: String::new(),
                content: content.to_string(),
                mode: AccessMode::Write,
                key_type: KeyType::Principal,
                login_source_id,
                verified: false,
            })
        })?;
        audit::log_principal_added(owner_id, key.id, &key.content);

        self.writer.rewrite_all_principal_keys(self.store.as_ref())?;
        Ok(key)
    }
}
