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

//! Trust classification of verified commits.
//!
//! A signature that verifies is not necessarily trustworthy for a given
//! repository. The [`TrustModel`] decides whether the signer's relation to
//! the committer and to the repository makes it so.

use crate::error::KeyError;
use crate::models::{CommitVerification, TrustModel, TrustStatus, User};
use std::collections::HashMap;

/// Membership answers per GPG signing key id for one batch of commits.
pub type MembershipCache = HashMap<String, bool>;

/// Repository membership predicate for the signing account.
pub type MembershipFn<'a> = dyn FnMut(&User) -> Result<bool, KeyError> + 'a;

/// Set `verification.trust_status` under `model`. Unverified results are
/// left untouched.
///
/// `is_member` is only consulted for account-backed GPG signers under the
/// collaborator models, at most once per key id when `cache` is given. An
/// account-backed SSH signer stays trusted.
/// A failing predicate classifies the signer as a non-member and the error
/// is returned after the status is set.
pub fn calculate_trust_status(
    verification: &mut CommitVerification,
    model: TrustModel,
    is_member: &mut MembershipFn<'_>,
    cache: Option<&mut MembershipCache>,
) -> Result<(), KeyError> {
    if !verification.verified {
        return Ok(());
    }

    let placeholder = User::placeholder("", "");
    let signer = verification
        .signing_user
        .clone()
        .unwrap_or_else(|| placeholder.clone());
    let committer = verification
        .committing_user
        .clone()
        .unwrap_or(placeholder);

    if model == TrustModel::Committer {
        let matched = (signer.id != 0 && committer.id == signer.id)
            || (signer.id == 0 && committer.id == 0 && signer.email == committer.email);
        verification.trust_status = Some(if matched {
            TrustStatus::Trusted
        } else {
            TrustStatus::Unmatched
        });
        return Ok(());
    }

    verification.trust_status = Some(TrustStatus::Trusted);

    if signer.id == 0 {
        // Signed by an installation key that no account owns.
        if model == TrustModel::CollaboratorCommitter
            && (committer.id != 0 || signer.email != committer.email)
        {
            verification.trust_status = Some(TrustStatus::Untrusted);
        }
        return Ok(());
    }

    let Some(key_id) = verification.signing_key.as_ref().map(|k| k.key_id.clone()) else {
        return Ok(());
    };

    let mut failure = None;
    let cached = cache.as_ref().and_then(|c| c.get(&key_id).copied());
    let member = match cached {
        Some(member) => member,
        None => match is_member(&signer) {
            Ok(member) => {
                if let Some(cache) = cache {
                    cache.insert(key_id, member);
                }
                member
            }
            Err(e) => {
                failure = Some(e);
                false
            }
        },
    };

    if !member {
        verification.trust_status = Some(if committer.id != signer.id {
            TrustStatus::Unmatched
        } else {
            TrustStatus::Untrusted
        });
    } else if model == TrustModel::CollaboratorCommitter && committer.id != signer.id {
        verification.trust_status = Some(TrustStatus::Unmatched);
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
