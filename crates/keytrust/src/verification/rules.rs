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

//! The ordered rules of the OpenPGP verification pipeline.
//!
//! Each rule looks for a key able to verify the signature. The first rule
//! producing a decision ends the pipeline; a rule that found a key by id
//! which failed to verify only downgrades the final reason.

use super::emails::{check_key_emails, emails_match};
use super::{CommitVerifier, RepositorySigningKey, SignedCommit, SigningSettings};
use crate::dal::{load_sub_keys, FindGpgKeyOptions, KeyStoreExt};
use crate::gpg::{check_armored_gpg_key_string, hash_and_verify_with_sub_keys, transient_gpg_key};
use crate::models::{CommitVerification, GpgKey, Reason, User};
use sequoia_openpgp::packet::Signature;
use std::collections::HashMap;

/// Everything a rule may inspect about the commit being verified.
pub struct VerifyContext<'a> {
    pub verifier: &'a CommitVerifier,
    pub commit: &'a SignedCommit,
    pub repository: &'a dyn RepositorySigningKey,
    pub signature: &'a Signature,
    pub payload: &'a [u8],
    /// The committer's account, or a placeholder for an unknown identity.
    pub committer: Option<&'a User>,
    /// The email recorded in the commit, not the account's.
    pub committer_email: &'a str,
    /// Issuer key id hint of the signature, possibly empty.
    pub key_id: &'a str,
}

impl VerifyContext<'_> {
    fn committer(&self) -> Option<User> {
        self.committer.cloned()
    }

    fn unverified(&self, reason: Reason) -> CommitVerification {
        CommitVerification::unverified(self.committer(), reason)
    }
}

/// What a rule concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// No applicable key.
    Skipped,
    /// A key matched the signature's key id but did not verify it.
    BadSignature,
    /// A final result, verified or not.
    Decided(CommitVerification),
}

impl RuleOutcome {
    fn from_verification(verification: Option<CommitVerification>) -> Self {
        match verification {
            None => RuleOutcome::Skipped,
            Some(v) if v.is_bad_signature() => RuleOutcome::BadSignature,
            Some(v) => RuleOutcome::Decided(v),
        }
    }
}

pub trait VerificationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &VerifyContext<'_>) -> RuleOutcome;
}

/// The pipeline in evaluation order.
pub fn default_rules() -> Vec<Box<dyn VerificationRule>> {
    vec![
        Box::new(IssuerKeyIdRule),
        Box::new(CommitterKeysRule),
        Box::new(InstanceKeyRule),
        Box::new(RepositoryKeyRule),
    ]
}

/// Verify with `key` or one of its subkeys, attributing success to `signer`.
fn verify_with_key(
    ctx: &VerifyContext<'_>,
    key: &GpgKey,
    signer: User,
    email: String,
) -> Option<CommitVerification> {
    match hash_and_verify_with_sub_keys(ctx.signature, ctx.payload, key) {
        Ok(Some(found)) => Some(CommitVerification::verified_gpg(
            ctx.committer(),
            signer,
            found.clone(),
            email,
        )),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Hashing payload of {} failed: {}", ctx.commit.id, e);
            Some(ctx.unverified(Reason::GenerateHashFailed))
        }
    }
}

/// Try every stored key, of any owner, whose id is `key_id`.
///
/// `name` and `email` describe the signer when the key has no owner
/// account. `None` when no key has that id.
fn verify_for_key_id(
    ctx: &VerifyContext<'_>,
    key_id: &str,
    name: &str,
    email: &str,
) -> Option<CommitVerification> {
    if key_id.is_empty() {
        return None;
    }

    let found = ctx.verifier.store().read(|q| {
        let mut keys = q.find_gpg_keys(&FindGpgKeyOptions {
            key_id: Some(key_id.to_string()),
            include_sub_keys: true,
            ..Default::default()
        })?;
        load_sub_keys(q, &mut keys)?;

        let mut primaries: HashMap<String, Vec<GpgKey>> = HashMap::new();
        for key in &keys {
            if key.is_primary() || primaries.contains_key(&key.primary_key_id) {
                continue;
            }
            let mut primary = q.find_gpg_keys(&FindGpgKeyOptions {
                key_id: Some(key.primary_key_id.clone()),
                include_sub_keys: true,
                ..Default::default()
            })?;
            load_sub_keys(q, &mut primary)?;
            primaries.insert(key.primary_key_id.clone(), primary);
        }
        Ok((keys, primaries))
    });

    let (keys, primaries) = match found {
        Ok(found) => found,
        Err(e) => {
            tracing::error!("Loading GPG keys with id {}: {}", key_id, e);
            return Some(ctx.unverified(Reason::FailedRetrievalKeys));
        }
    };
    if keys.is_empty() {
        return None;
    }

    let accounts = ctx.verifier.accounts();
    let no_reply = &ctx.verifier.config().service.no_reply_address;
    for key in &keys {
        let mut candidates = vec![key];
        if let Some(primary) = primaries.get(&key.primary_key_id) {
            candidates.extend(primary.iter());
        }

        let (activated, email) = check_key_emails(accounts, no_reply, email, &candidates);
        if !activated {
            continue;
        }

        let signer = if key.owner_id != 0 {
            match accounts.user_by_id(key.owner_id) {
                Ok(Some(owner)) => owner,
                Ok(None) => User::placeholder(name, email.clone()),
                Err(e) => {
                    tracing::error!(
                        "Loading owner {} of key {} ({}): {}",
                        key.owner_id,
                        key.id,
                        key.key_id,
                        e
                    );
                    return Some(ctx.unverified(Reason::NoCommitterAccount));
                }
            }
        } else {
            User::placeholder(name, email.clone())
        };

        if let Some(verification) = verify_with_key(ctx, key, signer, email) {
            return Some(verification);
        }
    }

    tracing::debug!(
        "Key id {} is known but no key with it verifies {}",
        key_id,
        ctx.commit.id
    );
    Some(CommitVerification::warning(ctx.committer(), Reason::BadSignature))
}

/// Try a signing identity that is not necessarily stored: first by its key
/// id among stored keys, then with the key material it carries.
fn verify_with_settings(
    ctx: &VerifyContext<'_>,
    settings: &SigningSettings,
) -> Option<CommitVerification> {
    if let Some(verification) =
        verify_for_key_id(ctx, &settings.key_id, &settings.name, &settings.email)
    {
        return Some(verification);
    }

    let certs = match check_armored_gpg_key_string(&settings.public_key_content) {
        Ok(certs) => certs,
        Err(e) => {
            tracing::error!("Unable to read signing key {}: {}", settings.key_id, e);
            return Some(ctx.unverified(Reason::GenerateHashFailed));
        }
    };

    for cert in &certs {
        let key = match transient_gpg_key(0, cert) {
            Ok(key) => key,
            Err(e) => {
                tracing::error!("Unable to encode signing key {}: {}", cert.keyid(), e);
                return Some(ctx.unverified(Reason::GenerateHashFailed));
            }
        };

        let signer = User::placeholder(settings.name.clone(), settings.email.clone());
        if let Some(verification) = verify_with_key(ctx, &key, signer, settings.email.clone()) {
            return Some(verification);
        }

        if ctx.key_id == key.key_id {
            // The signature names this signing key but does not verify.
            return Some(CommitVerification::warning(ctx.committer(), Reason::BadSignature));
        }
    }
    None
}

/// Stored keys of any owner matching the signature's issuer key id.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssuerKeyIdRule;

impl VerificationRule for IssuerKeyIdRule {
    fn name(&self) -> &'static str {
        "issuer-key-id"
    }

    fn evaluate(&self, ctx: &VerifyContext<'_>) -> RuleOutcome {
        let name = &ctx.verifier.config().app.name;
        RuleOutcome::from_verification(verify_for_key_id(ctx, ctx.key_id, name, ""))
    }
}

/// The committer account's own keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitterKeysRule;

impl VerificationRule for CommitterKeysRule {
    fn name(&self) -> &'static str {
        "committer-keys"
    }

    fn evaluate(&self, ctx: &VerifyContext<'_>) -> RuleOutcome {
        let Some(committer) = ctx.committer.filter(|c| c.id != 0) else {
            return RuleOutcome::Skipped;
        };

        let keys = ctx.verifier.store().read(|q| {
            let mut keys = q.find_gpg_keys(&FindGpgKeyOptions {
                owner_id: Some(committer.id),
                ..Default::default()
            })?;
            load_sub_keys(q, &mut keys)?;
            Ok(keys)
        });
        let keys = match keys {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("Loading GPG keys of user {}: {}", committer.id, e);
                return RuleOutcome::Decided(ctx.unverified(Reason::FailedRetrievalKeys));
            }
        };

        let activated = ctx
            .verifier
            .accounts()
            .email_addresses(committer.id)
            .map(|emails| {
                emails
                    .iter()
                    .any(|e| e.is_activated && emails_match(&e.email, ctx.committer_email))
            })
            .unwrap_or(false);

        for key in &keys {
            let email = if key.verified && activated {
                Some(ctx.committer_email.to_string())
            } else {
                key.emails
                    .iter()
                    .find(|e| e.is_activated && emails_match(&e.email, ctx.committer_email))
                    .map(|e| e.email.clone())
            };
            let Some(email) = email else {
                continue;
            };

            if let Some(verification) = verify_with_key(ctx, key, committer.clone(), email) {
                return RuleOutcome::Decided(verification);
            }
        }
        RuleOutcome::Skipped
    }
}

/// The installation-wide signing key, when one is configured explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceKeyRule;

impl VerificationRule for InstanceKeyRule {
    fn name(&self) -> &'static str {
        "instance-key"
    }

    fn evaluate(&self, ctx: &VerifyContext<'_>) -> RuleOutcome {
        let signing = &ctx.verifier.config().signing;
        if !super::uses_explicit_key(signing) {
            return RuleOutcome::Skipped;
        }

        let content = match ctx.verifier.installation_key() {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Error getting default signing key {}: {}", signing.signing_key, e);
                return RuleOutcome::Skipped;
            }
        };
        let settings = SigningSettings {
            sign: true,
            key_id: signing.signing_key.clone(),
            name: signing.signing_name.clone(),
            email: signing.signing_email.clone(),
            public_key_content: content,
        };
        RuleOutcome::from_verification(verify_with_settings(ctx, &settings))
    }
}

/// The default signing key of the commit's repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryKeyRule;

impl VerificationRule for RepositoryKeyRule {
    fn name(&self) -> &'static str {
        "repository-key"
    }

    fn evaluate(&self, ctx: &VerifyContext<'_>) -> RuleOutcome {
        match ctx.repository.default_public_key(ctx.commit) {
            Ok(Some(settings)) if settings.sign => {
                RuleOutcome::from_verification(verify_with_settings(ctx, &settings))
            }
            Ok(Some(_)) => RuleOutcome::Skipped,
            Ok(None) => {
                tracing::debug!(
                    "No default signing key for commit {}",
                    ctx.commit.id
                );
                RuleOutcome::Skipped
            }
            Err(e) => {
                tracing::error!("Error getting default public key: {}", e);
                RuleOutcome::Skipped
            }
        }
    }
}
