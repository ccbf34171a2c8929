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

//! SSH user key operations.

use super::KeyService;
use crate::audit;
use crate::dal::{FindPublicKeyOptions, KeyStoreExt, NewPublicKey};
use crate::error::{ErrorKind, KeyError};
use crate::models::{AccessMode, KeyType, PublicKey, User};
use crate::ssh::{check_public_key_string, verify_ssh_signature, OWNERSHIP_NAMESPACE};
use chrono::Utc;

impl KeyService {
    /// Normalise `content` to one OpenSSH line and enforce size limits.
    pub fn check_public_key_string(&self, content: &str) -> Result<String, KeyError> {
        check_public_key_string(content, &self.config.ssh, self.inspector.as_ref())
    }

    pub fn calc_fingerprint(&self, content: &str) -> Result<String, KeyError> {
        self.inspector
            .fingerprint(content)
            .map_err(|e| e.context(format!("fingerprinting with {}", self.inspector.name())))
    }

    /// Store a user key and append it to `authorized_keys`.
    pub fn add_public_key(
        &self,
        owner_id: i64,
        name: &str,
        content: &str,
        login_source_id: i64,
    ) -> Result<PublicKey, KeyError> {
        let content = self.check_public_key_string(content)?;
        let fingerprint = self.calc_fingerprint(&content)?;

        let key = self.store.write(|q| {
            if q.public_key_by_fingerprint(&fingerprint)?.is_some() {
                return Err(KeyError::KeyAlreadyExists {
                    fingerprint: fingerprint.clone(),
                });
            }
            if q.count_public_keys_by_owner_and_name(owner_id, name)? > 0 {
                return Err(KeyError::KeyNameAlreadyUsed {
                    owner_id,
                    name: name.to_string(),
                });
            }

            q.insert_public_key(&NewPublicKey {
                owner_id,
                name: name.to_string(),
                fingerprint: fingerprint.clone(),
                content: content.clone(),
                mode: AccessMode::Write,
                key_type: KeyType::User,
                login_source_id,
                verified: false,
            })
        })?;

        self.writer
            .append_public_keys(self.store.as_ref(), std::slice::from_ref(&key))?;
        audit::log_ssh_key_added(owner_id, key.id, &key.fingerprint, &key.key_type.to_string());
        Ok(key)
    }

    pub fn public_key_by_id(&self, id: i64) -> Result<PublicKey, KeyError> {
        self.store
            .read(|q| q.public_key_by_id(id))?
            .ok_or_else(|| KeyError::PublicKeyNotFound(format!("id: {}", id)))
    }

    /// The key whose content is exactly `content`.
    pub fn search_public_key_by_content(&self, content: &str) -> Result<PublicKey, KeyError> {
        self.store
            .read(|q| q.public_key_by_content(content))?
            .ok_or_else(|| KeyError::PublicKeyNotFound(format!("content: {}", content)))
    }

    /// The first key whose content starts with `prefix`, so that a key can be
    /// found without its trailing comment.
    pub fn search_public_key_by_content_prefix(&self, prefix: &str) -> Result<PublicKey, KeyError> {
        self.store
            .read(|q| q.public_keys_by_content_prefix(prefix))?
            .into_iter()
            .next()
            .ok_or_else(|| KeyError::PublicKeyNotFound(format!("content: {}", prefix)))
    }

    /// Keys matching an owner and a fingerprint; `0` and `""` match anything.
    pub fn search_public_keys(
        &self,
        owner_id: i64,
        fingerprint: &str,
    ) -> Result<Vec<PublicKey>, KeyError> {
        let opts = FindPublicKeyOptions {
            owner_id: (owner_id != 0).then_some(owner_id),
            fingerprint: (!fingerprint.is_empty()).then(|| fingerprint.to_string()),
            ..Default::default()
        };
        self.store.read(|q| q.find_public_keys(&opts))
    }

    /// User keys of `owner_id`.
    pub fn list_public_keys(&self, owner_id: i64) -> Result<Vec<PublicKey>, KeyError> {
        let opts = FindPublicKeyOptions {
            owner_id: Some(owner_id),
            key_types: vec![KeyType::User],
            ..Default::default()
        };
        self.store.read(|q| q.find_public_keys(&opts))
    }

    /// Keys of `owner_id` synchronised from an external auth source.
    pub fn list_public_keys_by_source(
        &self,
        owner_id: i64,
        login_source_id: i64,
    ) -> Result<Vec<PublicKey>, KeyError> {
        let opts = FindPublicKeyOptions {
            owner_id: Some(owner_id),
            login_source_id: Some(login_source_id),
            ..Default::default()
        };
        self.store.read(|q| q.find_public_keys(&opts))
    }

    /// Record that a key was just used.
    pub fn update_public_key_updated(&self, id: i64) -> Result<(), KeyError> {
        let rows = self.store.write(|q| q.touch_public_key(id, Utc::now()))?;
        if rows == 0 {
            return Err(KeyError::PublicKeyNotFound(format!("id: {}", id)));
        }
        Ok(())
    }

    /// Delete a key owned by `doer`, or any key when `doer` is an admin, then
    /// regenerate the file the key was listed in.
    pub fn delete_public_key(&self, doer: &User, id: i64) -> Result<(), KeyError> {
        let key = self.public_key_by_id(id)?;
        if !doer.is_admin && doer.id != key.owner_id {
            return Err(KeyError::AccessDenied {
                user_id: doer.id,
                key_id: key.id,
                note: "public".to_string(),
            });
        }

        self.store.write(|q| q.delete_public_keys(&[key.id]))?;
        audit::log_ssh_key_deleted(doer.id, key.id, &key.fingerprint);

        if key.key_type == KeyType::Principal {
            self.writer.rewrite_all_principal_keys(self.store.as_ref())
        } else {
            self.writer.rewrite_all_public_keys(self.store.as_ref())
        }
    }

    /// Whether any of `keys` is owned by an auth source that synchronises
    /// keys from upstream, so local edits would be overwritten.
    pub fn public_keys_are_externally_managed(&self, keys: &[PublicKey]) -> Result<bool, KeyError> {
        for key in keys.iter().filter(|k| k.login_source_id != 0) {
            if self.accounts.auth_source_syncs_keys(key.login_source_id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Mark the key of `owner_id` with `fingerprint` verified when
    /// `signature` is an SSH signature over `token`. Returns the fingerprint.
    pub fn verify_ssh_key(
        &self,
        owner_id: i64,
        fingerprint: &str,
        token: &str,
        signature: &str,
    ) -> Result<String, KeyError> {
        let key = self
            .search_public_keys(owner_id, fingerprint)?
            .into_iter()
            .find(|k| k.owner_id == owner_id && k.fingerprint == fingerprint)
            .ok_or_else(|| KeyError::PublicKeyNotFound(format!("fingerprint: {}", fingerprint)))?;

        let mut last = String::from("signature does not verify with the key");
        let mut matched = false;
        for candidate in [token.to_string(), format!("{}\r\n", token)] {
            match verify_ssh_signature(
                &key.content,
                signature,
                candidate.as_bytes(),
                OWNERSHIP_NAMESPACE,
            ) {
                Ok(true) => {
                    matched = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => last = e.to_string(),
            }
        }
        if !matched {
            tracing::error!("Unable to validate token signature for {}: {}", key.fingerprint, last);
            audit::log_ownership_proof_failed(owner_id, &key.fingerprint, &last);
            return Err(KeyError::SshInvalidTokenSignature {
                fingerprint: key.fingerprint,
                reason: last,
            });
        }

        self.store.write(|q| q.set_public_key_verified(key.id))?;
        audit::log_ssh_key_verified(owner_id, &key.fingerprint);
        Ok(key.fingerprint)
    }

    /// [`verify_ssh_key`](Self::verify_ssh_key) against the tokens currently
    /// issued to `user`.
    pub fn prove_ssh_key_ownership(
        &self,
        user: &User,
        fingerprint: &str,
        signature: &str,
    ) -> Result<String, KeyError> {
        let mut last = None;
        for token in self.accepted_tokens(user) {
            match self.verify_ssh_key(user.id, fingerprint, &token, signature) {
                Ok(fingerprint) => return Ok(fingerprint),
                Err(e) if e.kind() == ErrorKind::InvalidTokenSignature => last = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| KeyError::SshInvalidTokenSignature {
            fingerprint: fingerprint.to_string(),
            reason: "no token accepted".to_string(),
        }))
    }
}
