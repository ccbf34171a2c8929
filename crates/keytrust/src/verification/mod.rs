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

//! Commit signature verification.
//!
//! This module provides:
//! - The git-object inputs ([`SignedCommit`]) and the repository default
//!   signing key collaborator ([`RepositorySigningKey`])
//! - [`CommitVerifier`], which runs an ordered pipeline of
//!   [`VerificationRule`]s over an OpenPGP signature and a separate path for
//!   SSH signatures
//! - Batch verification with trust classification
//!
//! Failing to verify is never an error: every outcome is a
//! [`CommitVerification`](crate::models::CommitVerification) carrying a
//! [`Reason`](crate::models::Reason).

mod emails;
mod rules;
mod signing_key;
mod ssh;
mod verifier;

use crate::error::KeyError;

pub use emails::{check_key_emails, emails_match};
pub use rules::{
    default_rules, CommitterKeysRule, InstanceKeyRule, IssuerKeyIdRule, RepositoryKeyRule,
    RuleOutcome, VerificationRule, VerifyContext,
};
pub use signing_key::{load_installation_key, uses_explicit_key};
pub use verifier::CommitVerifier;

/// Name and email of a commit's author or committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

/// A detached signature with the exact bytes it signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSignature {
    /// Armored OpenPGP signature or SSHSIG envelope.
    pub signature: String,
    pub payload: String,
}

/// The parts of a git commit needed to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCommit {
    pub id: String,
    pub committer: Option<CommitIdentity>,
    pub signature: Option<CommitSignature>,
}

/// A signing identity and its public key material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningSettings {
    pub sign: bool,
    pub key_id: String,
    pub name: String,
    pub email: String,
    /// Armored public key block.
    pub public_key_content: String,
}

/// Supplies the default signing key of the repository a commit belongs to.
pub trait RepositorySigningKey {
    fn default_public_key(&self, commit: &SignedCommit)
        -> Result<Option<SigningSettings>, KeyError>;
}

/// A repository without a default signing key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepositoryKey;

impl RepositorySigningKey for NoRepositoryKey {
    fn default_public_key(
        &self,
        _commit: &SignedCommit,
    ) -> Result<Option<SigningSettings>, KeyError> {
        Ok(None)
    }
}

impl RepositorySigningKey for SigningSettings {
    fn default_public_key(
        &self,
        _commit: &SignedCommit,
    ) -> Result<Option<SigningSettings>, KeyError> {
        Ok(Some(self.clone()))
    }
}
