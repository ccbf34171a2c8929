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

//! Deploy keys: SSH keys bound to repositories rather than accounts.
//!
//! One deploy-typed public key may serve several repositories; each binding
//! is a [`DeployKey`] row.

use super::KeyService;
use crate::audit;
use crate::dal::{FindDeployKeyOptions, KeyStoreExt, NewDeployKey, NewPublicKey};
use crate::error::KeyError;
use crate::models::{AccessMode, DeployKey, KeyType, User};

impl KeyService {
    /// Bind the key in `content` to `repo_id`, creating the public key the
    /// first time it is used.
    pub fn add_deploy_key(
        &self,
        repo_id: i64,
        name: &str,
        content: &str,
        read_only: bool,
    ) -> Result<DeployKey, KeyError> {
        let content = self.check_public_key_string(content)?;
        let fingerprint = self.calc_fingerprint(&content)?;
        let mode = if read_only {
            AccessMode::Read
        } else {
            AccessMode::Write
        };

        let (deploy_key, created) = self.store.write(|q| {
            let (public_key, created) = match q.public_key_by_fingerprint(&fingerprint)? {
                Some(existing) if existing.key_type != KeyType::Deploy => {
                    return Err(KeyError::KeyAlreadyExists {
                        fingerprint: fingerprint.clone(),
                    });
                }
                Some(existing) => (existing, false),
                None => {
                    let created = q.insert_public_key(&NewPublicKey {
                        owner_id: 0,
                        name: name.to_string(),
                        fingerprint: fingerprint.clone(),
                        content: content.clone(),
                        mode,
                        key_type: KeyType::Deploy,
                        login_source_id: 0,
                        verified: false,
                    })?;
                    (created, true)
                }
            };

            if q.deploy_key_by_key_and_repo(public_key.id, repo_id)?.is_some() {
                return Err(KeyError::DeployKeyAlreadyExists {
                    key_id: public_key.id,
                    repo_id,
                });
            }
            if q.count_deploy_keys_by_repo_and_name(repo_id, name)? > 0 {
                return Err(KeyError::DeployKeyNameAlreadyUsed {
                    repo_id,
                    name: name.to_string(),
                });
            }

            let deploy_key = q.insert_deploy_key(&NewDeployKey {
                key_id: public_key.id,
                repo_id,
                name: name.to_string(),
                fingerprint: public_key.fingerprint.clone(),
                mode,
            })?;
            Ok((deploy_key, created.then_some(public_key)))
        })?;

        if let Some(public_key) = created {
            self.writer
                .append_public_keys(self.store.as_ref(), std::slice::from_ref(&public_key))?;
        }

        audit::log_deploy_key_added(
            repo_id,
            deploy_key.id,
            &deploy_key.fingerprint,
            deploy_key.is_read_only(),
        );
        Ok(deploy_key)
    }

    pub fn deploy_key_by_id(&self, id: i64) -> Result<DeployKey, KeyError> {
        self.store
            .read(|q| q.deploy_key_by_id(id))?
            .ok_or_else(|| KeyError::DeployKeyNotFound(format!("id: {}", id)))
    }

    pub fn deploy_key_by_repo(&self, key_id: i64, repo_id: i64) -> Result<DeployKey, KeyError> {
        self.store
            .read(|q| q.deploy_key_by_key_and_repo(key_id, repo_id))?
            .ok_or_else(|| {
                KeyError::DeployKeyNotFound(format!("key_id: {}, repo_id: {}", key_id, repo_id))
            })
    }

    /// Whether public key `key_id` is a deploy key of `repo_id`.
    pub fn has_deploy_key(&self, key_id: i64, repo_id: i64) -> Result<bool, KeyError> {
        Ok(self
            .store
            .read(|q| q.deploy_key_by_key_and_repo(key_id, repo_id))?
            .is_some())
    }

    pub fn list_deploy_keys(&self, repo_id: i64) -> Result<Vec<DeployKey>, KeyError> {
        let opts = FindDeployKeyOptions {
            repo_id: Some(repo_id),
            ..Default::default()
        };
        self.store.read(|q| q.find_deploy_keys(&opts))
    }

    /// Deploy keys matching every non-zero, non-empty argument.
    pub fn search_deploy_keys(
        &self,
        repo_id: i64,
        key_id: i64,
        fingerprint: &str,
    ) -> Result<Vec<DeployKey>, KeyError> {
        let opts = FindDeployKeyOptions {
            repo_id: (repo_id != 0).then_some(repo_id),
            key_id: (key_id != 0).then_some(key_id),
            fingerprint: (!fingerprint.is_empty()).then(|| fingerprint.to_string()),
        };
        self.store.read(|q| q.find_deploy_keys(&opts))
    }

    /// Whether any repository still uses public key `key_id`.
    pub fn is_deploy_key_exist_by_key_id(&self, key_id: i64) -> Result<bool, KeyError> {
        Ok(self.store.read(|q| q.count_deploy_keys_by_key_id(key_id))? > 0)
    }

    /// The OpenSSH line behind a deploy key binding.
    pub fn deploy_key_content(&self, key: &DeployKey) -> Result<String, KeyError> {
        Ok(self.public_key_by_id(key.key_id)?.content)
    }

    /// Remove a binding. The public key goes too once no repository uses it.
    ///
    /// Requires `doer` to be an admin or an administrator of the repository.
    /// A binding that does not exist is treated as already removed.
    pub fn delete_deploy_key(&self, doer: &User, id: i64) -> Result<(), KeyError> {
        let Some(key) = self.store.read(|q| q.deploy_key_by_id(id))? else {
            return Ok(());
        };

        if !doer.is_admin && !self.accounts.is_repo_admin(doer, key.repo_id)? {
            return Err(KeyError::AccessDenied {
                user_id: doer.id,
                key_id: key.id,
                note: "deploy".to_string(),
            });
        }

        let key_removed = self.store.write(|q| {
            q.delete_deploy_key(key.id)?;
            if q.count_deploy_keys_by_key_id(key.key_id)? == 0 {
                q.delete_public_keys(&[key.key_id])?;
                return Ok(true);
            }
            Ok(false)
        })?;
        audit::log_deploy_key_deleted(doer.id, key.repo_id, key.id, key_removed);

        if key_removed {
            self.writer.rewrite_all_public_keys(self.store.as_ref())?;
        }
        Ok(())
    }
}
