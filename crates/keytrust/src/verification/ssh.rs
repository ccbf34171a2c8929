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

//! Verification of SSH-signed commits.
//!
//! SSH signatures carry no portable key id, so only the committer's own
//! verified keys and the installation's trusted keys are tried.

use super::emails::emails_match;
use super::{CommitSignature, CommitVerifier};
use crate::dal::{FindPublicKeyOptions, KeyStoreExt};
use crate::models::{AccessMode, CommitVerification, KeyType, PublicKey, Reason, User};
use crate::ssh::{verify_ssh_signature, GIT_NAMESPACE};
use chrono::{DateTime, Utc};

fn signature_matches(content: &str, signature: &CommitSignature) -> bool {
    match verify_ssh_signature(
        content,
        &signature.signature,
        signature.payload.as_bytes(),
        GIT_NAMESPACE,
    ) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::debug!("SSH signature check failed: {}", e);
            false
        }
    }
}

/// A transient record for an installation-trusted key.
fn trusted_key(verifier: &CommitVerifier, content: &str) -> PublicKey {
    let fingerprint = verifier
        .inspector()
        .fingerprint(content)
        .unwrap_or_else(|e| {
            tracing::warn!("Fingerprinting trusted SSH key: {}", e);
            String::new()
        });
    PublicKey {
        id: 0,
        owner_id: 0,
        name: String::new(),
        fingerprint,
        content: content.to_string(),
        mode: AccessMode::Read,
        key_type: KeyType::User,
        login_source_id: 0,
        verified: true,
        created_at: DateTime::<Utc>::default(),
        updated_at: DateTime::<Utc>::default(),
    }
}

pub(super) fn verify_ssh_commit(
    verifier: &CommitVerifier,
    signature: &CommitSignature,
    committer: Option<&User>,
    committer_email: &str,
) -> CommitVerification {
    if let Some(user) = committer.filter(|c| c.id != 0) {
        let keys = verifier.store().read(|q| {
            q.find_public_keys(&FindPublicKeyOptions {
                owner_id: Some(user.id),
                not_key_type: Some(KeyType::Principal),
                ..Default::default()
            })
        });
        let keys = match keys {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("Loading SSH keys of user {}: {}", user.id, e);
                return CommitVerification::unverified(
                    committer.cloned(),
                    Reason::FailedRetrievalKeys,
                );
            }
        };

        let activated = verifier
            .accounts()
            .email_addresses(user.id)
            .map(|emails| {
                emails
                    .iter()
                    .any(|e| e.is_activated && emails_match(&e.email, committer_email))
            })
            .unwrap_or(false);

        if activated {
            for key in keys.iter().filter(|k| k.verified) {
                if signature_matches(&key.content, signature) {
                    return CommitVerification::verified_ssh(
                        committer.cloned(),
                        user.clone(),
                        key.clone(),
                        committer_email.to_string(),
                    );
                }
            }
        }
    }

    let signing = &verifier.config().signing;
    for content in &signing.trusted_ssh_keys {
        if signature_matches(content, signature) {
            let signer = User::placeholder(signing.signing_name.clone(), signing.signing_email.clone());
            return CommitVerification::verified_ssh(
                committer.cloned(),
                signer,
                trusted_key(verifier, content),
                signing.signing_email.clone(),
            );
        }
    }

    CommitVerification::unverified(committer.cloned(), Reason::NoKeyFound)
}
