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

//! GPG key import, lookup, deletion and ownership proof.

use super::KeyService;
use crate::audit;
use crate::dal::{load_sub_keys, FindGpgKeyOptions, KeyStoreExt};
use crate::error::{ErrorKind, KeyError, ResultExt};
use crate::gpg::{
    check_armored_gpg_key_string, coalesce_certs, extract_signature,
    hash_and_verify_with_sub_keys, parse_gpg_key, token_variants, verify_token_signature,
};
use crate::models::{GpgKey, GpgKeyImport, User};
use sequoia_openpgp::Cert;

impl KeyService {
    /// Import the keys in an armored block for `owner_id`.
    ///
    /// With a `signature` over `token`, only the certificate that made it is
    /// kept and it is stored verified. Without one, every certificate must
    /// carry an identity matching an activated address of the owner.
    /// Either all keys are stored or none.
    pub fn add_gpg_key(
        &self,
        owner_id: i64,
        content: &str,
        token: &str,
        signature: &str,
    ) -> Result<Vec<GpgKey>, KeyError> {
        let result = self.import_gpg_keys(owner_id, content, token, signature);
        match &result {
            Ok(keys) => {
                for key in keys {
                    audit::log_gpg_key_added(owner_id, &key.key_id, key.sub_keys.len(), key.verified);
                }
            }
            Err(e) => audit::log_gpg_key_add_failed(owner_id, &e.to_string()),
        }
        result
    }

    fn import_gpg_keys(
        &self,
        owner_id: i64,
        content: &str,
        token: &str,
        signature: &str,
    ) -> Result<Vec<GpgKey>, KeyError> {
        let certs = check_armored_gpg_key_string(content)?;

        let (certs, verified) = if signature.is_empty() {
            (coalesce_certs(certs)?, false)
        } else {
            let signer = verify_token_signature(&certs, token, signature)
                .map_err(|e| KeyError::InvalidTokenSignature {
                    id: certs
                        .first()
                        .map(|c| c.keyid().to_hex())
                        .unwrap_or_default(),
                    reason: e.to_string(),
                })?
                .clone();
            (vec![signer], true)
        };

        let emails = self.accounts.email_addresses(owner_id)?;
        let mut keys = certs
            .iter()
            .map(|cert| parse_gpg_key(owner_id, cert, verified, &emails))
            .collect::<Result<Vec<_>, _>>()?;

        self.store.write(|q| {
            for key in keys.iter_mut() {
                if q.count_primary_gpg_keys(&key.key_id)? > 0 {
                    return Err(KeyError::GpgKeyIdAlreadyUsed {
                        key_id: key.key_id.clone(),
                    });
                }
                key.id = q.insert_gpg_key(key)?;
                for sub in key.sub_keys.iter_mut() {
                    sub.id = q.insert_gpg_key(sub)?;
                }
                q.insert_gpg_import(&GpgKeyImport {
                    key_id: key.key_id.clone(),
                    content: content.to_string(),
                })?;
            }
            Ok(())
        })?;

        Ok(keys)
    }

    /// Primary keys of `owner_id` with their subkeys.
    pub fn list_gpg_keys(&self, owner_id: i64) -> Result<Vec<GpgKey>, KeyError> {
        self.store.read(|q| {
            let mut keys = q.find_gpg_keys(&FindGpgKeyOptions {
                owner_id: Some(owner_id),
                ..Default::default()
            })?;
            load_sub_keys(q, &mut keys)?;
            Ok(keys)
        })
    }

    pub fn gpg_key_for_user_by_id(&self, owner_id: i64, id: i64) -> Result<GpgKey, KeyError> {
        self.store
            .read(|q| q.gpg_key_by_owner_and_id(owner_id, id))?
            .ok_or_else(|| KeyError::GpgKeyNotFound { id: id.to_string() })
    }

    pub fn gpg_import_by_key_id(&self, key_id: &str) -> Result<GpgKeyImport, KeyError> {
        self.store
            .read(|q| q.gpg_import(key_id))?
            .ok_or_else(|| KeyError::GpgImportNotFound {
                key_id: key_id.to_string(),
            })
    }

    /// Rebuild the full certificate of `key` from its import record.
    pub fn gpg_key_to_cert(&self, key: &GpgKey) -> Result<Cert, KeyError> {
        let primary_id = key.primary_id().to_string();
        let import = self.gpg_import_by_key_id(&primary_id)?;
        let certs = coalesce_certs(check_armored_gpg_key_string(&import.content)?)?;

        let mut fallback = None;
        for cert in certs {
            if cert.keyid().to_hex() == primary_id {
                return Ok(cert);
            }
            fallback.get_or_insert(cert);
        }
        fallback.ok_or_else(|| KeyError::GpgImportNotFound { key_id: primary_id })
    }

    /// Delete a key of `doer` with its subkeys and import record.
    ///
    /// A key that does not exist, or belongs to someone else, is treated as
    /// already deleted.
    pub fn delete_gpg_key(&self, doer: &User, id: i64) -> Result<(), KeyError> {
        let key = match self.gpg_key_for_user_by_id(doer.id, id) {
            Ok(key) => key,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if key.key_id.is_empty() {
            return Err(KeyError::InvalidKey("empty GPG key id".to_string()));
        }

        let rows = self
            .store
            .write(|q| q.delete_gpg_key_by_key_id(&key.key_id))
            .with_context(|| format!("deleting GPG key {}", key.key_id))?;
        audit::log_gpg_key_deleted(doer.id, &key.key_id, rows);
        Ok(())
    }

    /// Mark a key verified when `signature` over `token` was made by it or
    /// one of its subkeys. Returns the key id.
    pub fn verify_gpg_key(
        &self,
        owner_id: i64,
        key_id: &str,
        token: &str,
        signature: &str,
    ) -> Result<String, KeyError> {
        let key = self
            .store
            .read(|q| {
                let mut keys = q.find_gpg_keys(&FindGpgKeyOptions {
                    owner_id: Some(owner_id),
                    key_id: Some(key_id.to_string()),
                    include_sub_keys: false,
                })?;
                load_sub_keys(q, &mut keys)?;
                Ok(keys.into_iter().next())
            })?
            .ok_or_else(|| KeyError::GpgKeyNotFound {
                id: key_id.to_string(),
            })?;

        let invalid = |reason: String| {
            audit::log_ownership_proof_failed(owner_id, &key.key_id, &reason);
            KeyError::InvalidTokenSignature {
                id: key.key_id.clone(),
                reason,
            }
        };

        let sig = extract_signature(signature).map_err(|e| invalid(e.to_string()))?;
        let mut signer = None;
        for candidate in token_variants(token) {
            match hash_and_verify_with_sub_keys(&sig, candidate.as_bytes(), &key) {
                Ok(Some(found)) => {
                    signer = Some(found.clone());
                    break;
                }
                Ok(None) => {}
                Err(e) => return Err(invalid(e.to_string())),
            }
        }
        let signer =
            signer.ok_or_else(|| invalid("signature does not verify with the key".to_string()))?;

        if signer.primary_key_id != key.key_id && signer.key_id != key.key_id {
            return Err(KeyError::GpgKeyNotFound {
                id: key.key_id.clone(),
            });
        }

        self.store.write(|q| q.set_gpg_key_verified(key.id))?;
        audit::log_gpg_key_verified(owner_id, &key.key_id);
        Ok(key.key_id)
    }

    /// [`verify_gpg_key`](Self::verify_gpg_key) against the tokens currently
    /// issued to `user`.
    pub fn prove_gpg_key_ownership(
        &self,
        user: &User,
        key_id: &str,
        signature: &str,
    ) -> Result<String, KeyError> {
        let mut last = None;
        for token in self.accepted_tokens(user) {
            match self.verify_gpg_key(user.id, key_id, &token, signature) {
                Ok(id) => return Ok(id),
                Err(e) if e.kind() == ErrorKind::InvalidTokenSignature => last = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| KeyError::InvalidTokenSignature {
            id: key_id.to_string(),
            reason: "no token accepted".to_string(),
        }))
    }
}
