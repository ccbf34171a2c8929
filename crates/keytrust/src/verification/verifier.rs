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

use super::rules::{default_rules, RuleOutcome, VerificationRule, VerifyContext};
use super::signing_key::load_installation_key;
use super::{ssh, RepositorySigningKey, SignedCommit};
use crate::accounts::AccountDirectory;
use crate::audit;
use crate::config::KeyTrustConfig;
use crate::dal::KeyStore;
use crate::error::KeyError;
use crate::gpg::{extract_signature, issuer_key_id};
use crate::models::{CommitVerification, GpgKey, Reason, TrustModel, User};
use crate::ssh::{is_ssh_signature, KeyInspector};
use crate::trust::{calculate_trust_status, MembershipCache, MembershipFn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Verifies commit signatures against the key store.
///
/// Holds no per-commit state; one verifier can serve any number of
/// concurrent verifications.
pub struct CommitVerifier {
    store: Arc<dyn KeyStore>,
    accounts: Arc<dyn AccountDirectory>,
    inspector: Arc<dyn KeyInspector>,
    config: Arc<KeyTrustConfig>,
    rules: Vec<Box<dyn VerificationRule>>,
    installation_key: Mutex<Option<String>>,
}

impl CommitVerifier {
    pub fn new(
        store: Arc<dyn KeyStore>,
        accounts: Arc<dyn AccountDirectory>,
        inspector: Arc<dyn KeyInspector>,
        config: Arc<KeyTrustConfig>,
    ) -> Self {
        Self {
            store,
            accounts,
            inspector,
            config,
            rules: default_rules(),
            installation_key: Mutex::new(None),
        }
    }

    /// Replace the OpenPGP rule pipeline.
    pub fn with_rules(mut self, rules: Vec<Box<dyn VerificationRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn store(&self) -> &dyn KeyStore {
        self.store.as_ref()
    }

    pub fn accounts(&self) -> &dyn AccountDirectory {
        self.accounts.as_ref()
    }

    pub fn inspector(&self) -> &dyn KeyInspector {
        self.inspector.as_ref()
    }

    pub fn config(&self) -> &KeyTrustConfig {
        &self.config
    }

    /// The armored installation signing key, loaded once and then reused.
    pub fn installation_key(&self) -> Result<String, KeyError> {
        let mut cached = self.installation_key.lock();
        if let Some(content) = cached.as_ref() {
            return Ok(content.clone());
        }
        let content = load_installation_key(&self.config.signing)?;
        *cached = Some(content.clone());
        Ok(content)
    }

    /// Verify one commit.
    pub fn verify_commit(
        &self,
        commit: &SignedCommit,
        repository: &dyn RepositorySigningKey,
    ) -> CommitVerification {
        let verification = self.evaluate(commit, repository);
        if verification.verified {
            let signer = verification
                .signing_user
                .as_ref()
                .map(|u| u.name.as_str())
                .unwrap_or_default();
            let key = match (&verification.signing_key, &verification.signing_ssh_key) {
                (Some(key), _) => key.key_id.as_str(),
                (None, Some(key)) => key.fingerprint.as_str(),
                (None, None) => "",
            };
            audit::log_commit_verified(&commit.id, signer, key);
        } else {
            audit::log_commit_unverified(
                &commit.id,
                verification.reason.code(),
                verification.warning,
            );
        }
        verification
    }

    /// Verify `commits` and classify each under `model`.
    ///
    /// Membership answers are shared across the batch per signing key.
    pub fn verify_commits(
        &self,
        commits: &[SignedCommit],
        repository: &dyn RepositorySigningKey,
        model: TrustModel,
        is_member: &mut MembershipFn<'_>,
    ) -> Vec<CommitVerification> {
        let mut cache = MembershipCache::new();
        commits
            .iter()
            .map(|commit| {
                let mut verification = self.verify_commit(commit, repository);
                if let Err(e) =
                    calculate_trust_status(&mut verification, model, is_member, Some(&mut cache))
                {
                    tracing::warn!("Trust status of {} could not be computed: {}", commit.id, e);
                }
                verification
            })
            .collect()
    }

    fn resolve_committer(&self, commit: &SignedCommit) -> Result<Option<User>, User> {
        let Some(identity) = &commit.committer else {
            return Ok(None);
        };
        match self.accounts.user_by_email(&identity.email) {
            Ok(Some(user)) => Ok(Some(user)),
            Ok(None) => Ok(Some(User::placeholder(
                identity.name.clone(),
                identity.email.clone(),
            ))),
            Err(e) => {
                tracing::error!("Looking up committer {}: {}", identity.email, e);
                Err(User::placeholder(identity.name.clone(), identity.email.clone()))
            }
        }
    }

    fn evaluate(
        &self,
        commit: &SignedCommit,
        repository: &dyn RepositorySigningKey,
    ) -> CommitVerification {
        let committer = match self.resolve_committer(commit) {
            Ok(committer) => committer,
            Err(placeholder) => {
                return CommitVerification::unverified(
                    Some(placeholder),
                    Reason::NoCommitterAccount,
                )
            }
        };
        let committer_email = commit
            .committer
            .as_ref()
            .map(|c| c.email.as_str())
            .unwrap_or_default();

        let Some(signature) = &commit.signature else {
            return CommitVerification::unverified(committer, Reason::NotSigned);
        };

        if is_ssh_signature(&signature.signature) {
            return ssh::verify_ssh_commit(self, signature, committer.as_ref(), committer_email);
        }

        let sig = match extract_signature(&signature.signature) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::debug!("Reading signature of {}: {}", commit.id, e);
                return CommitVerification::unverified(committer, Reason::ExtractSignatureFailed);
            }
        };
        let key_id = issuer_key_id(&sig);

        let ctx = VerifyContext {
            verifier: self,
            commit,
            repository,
            signature: &sig,
            payload: signature.payload.as_bytes(),
            committer: committer.as_ref(),
            committer_email,
            key_id: &key_id,
        };

        let mut reason = Reason::NoKeyFound;
        for rule in &self.rules {
            match rule.evaluate(&ctx) {
                RuleOutcome::Decided(verification) => return verification,
                RuleOutcome::BadSignature => {
                    tracing::debug!("Rule {} saw a bad signature on {}", rule.name(), commit.id);
                    reason = Reason::BadSignature;
                }
                RuleOutcome::Skipped => {}
            }
        }

        let warning = reason != Reason::NoKeyFound;
        CommitVerification {
            warning,
            signing_key: Some(GpgKey::stub(key_id.clone())),
            ..CommitVerification::unverified(committer.clone(), reason)
        }
    }
}
