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

//! Commit verification results.
//!
//! A [`CommitVerification`] is computed on demand and never persisted. A
//! commit that cannot be verified is a normal outcome carrying a [`Reason`],
//! not an error.

use super::{GpgKey, PublicKey, User};
use std::fmt;

/// Why a commit is (or is not) verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    NotSigned,
    ExtractSignatureFailed,
    FailedRetrievalKeys,
    NoCommitterAccount,
    GenerateHashFailed,
    NoKeyFound,
    /// A stored key matched the signature's key id but did not verify it.
    BadSignature,
    BadDefaultSignature,
    /// `<signer name> / <key id or fingerprint>`.
    Verified(String),
}

impl Reason {
    pub fn code(&self) -> &str {
        match self {
            Reason::NotSigned => "gpg.error.not_signed_commit",
            Reason::ExtractSignatureFailed => "gpg.error.extract_sign",
            Reason::FailedRetrievalKeys => "gpg.error.failed_retrieval_gpg_keys",
            Reason::NoCommitterAccount => "gpg.error.no_committer_account",
            Reason::GenerateHashFailed => "gpg.error.generate_hash",
            Reason::NoKeyFound => "gpg.error.no_gpg_keys_found",
            Reason::BadSignature => "gpg.error.probable_bad_signature",
            Reason::BadDefaultSignature => "gpg.error.probable_bad_default_signature",
            Reason::Verified(text) => text,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Organisational trust of a verified signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustStatus {
    Trusted,
    Untrusted,
    Unmatched,
}

impl TrustStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrustStatus::Trusted => "trusted",
            TrustStatus::Untrusted => "untrusted",
            TrustStatus::Unmatched => "unmatched",
        }
    }
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository policy deciding when a valid signature is also trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustModel {
    /// Trusted only when the signer is the committer.
    Committer,
    /// Trusted when the signer is a repository member.
    Collaborator,
    /// Trusted when the signer is a member and also the committer.
    CollaboratorCommitter,
}

impl std::str::FromStr for TrustModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "committer" => Ok(TrustModel::Committer),
            "collaborator" => Ok(TrustModel::Collaborator),
            "collaboratorcommitter" | "collaborator_committer" => {
                Ok(TrustModel::CollaboratorCommitter)
            }
            other => Err(format!("unknown trust model: {}", other)),
        }
    }
}

/// Outcome of verifying one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitVerification {
    pub verified: bool,
    pub warning: bool,
    pub reason: Reason,
    pub signing_user: Option<User>,
    pub committing_user: Option<User>,
    pub signing_email: String,
    pub signing_key: Option<GpgKey>,
    pub signing_ssh_key: Option<PublicKey>,
    pub trust_status: Option<TrustStatus>,
}

impl CommitVerification {
    /// An unverified result with the given reason.
    pub fn unverified(committer: Option<User>, reason: Reason) -> Self {
        Self {
            verified: false,
            warning: false,
            reason,
            signing_user: None,
            committing_user: committer,
            signing_email: String::new(),
            signing_key: None,
            signing_ssh_key: None,
            trust_status: None,
        }
    }

    /// An unverified result flagged as a warning.
    pub fn warning(committer: Option<User>, reason: Reason) -> Self {
        Self {
            warning: true,
            ..Self::unverified(committer, reason)
        }
    }

    /// A verified GPG result.
    pub fn verified_gpg(committer: Option<User>, signer: User, key: GpgKey, email: String) -> Self {
        Self {
            verified: true,
            warning: false,
            reason: Reason::Verified(format!("{} / {}", signer.name, key.key_id)),
            signing_user: Some(signer),
            committing_user: committer,
            signing_email: email,
            signing_key: Some(key),
            signing_ssh_key: None,
            trust_status: None,
        }
    }

    /// A verified SSH result.
    pub fn verified_ssh(
        committer: Option<User>,
        signer: User,
        key: PublicKey,
        email: String,
    ) -> Self {
        Self {
            verified: true,
            warning: false,
            reason: Reason::Verified(format!("{} / {}", signer.name, key.fingerprint)),
            signing_user: Some(signer),
            committing_user: committer,
            signing_email: email,
            signing_key: None,
            signing_ssh_key: Some(key),
            trust_status: None,
        }
    }

    pub fn is_bad_signature(&self) -> bool {
        self.reason == Reason::BadSignature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(Reason::NotSigned.code(), "gpg.error.not_signed_commit");
        assert_eq!(Reason::NoKeyFound.to_string(), "gpg.error.no_gpg_keys_found");
        assert_eq!(
            Reason::Verified("Antoine / AE8255B8A0D828E4".to_string()).code(),
            "Antoine / AE8255B8A0D828E4"
        );
    }

    #[test]
    fn test_verified_reason_text() {
        let signer = User::placeholder("Antoine GIRARD", "sapk@sapk.fr");
        let v = CommitVerification::verified_gpg(
            None,
            signer,
            GpgKey::stub("AE8255B8A0D828E4"),
            "sapk@sapk.fr".to_string(),
        );
        assert!(v.verified);
        assert_eq!(v.reason.code(), "Antoine GIRARD / AE8255B8A0D828E4");
    }

    #[test]
    fn test_trust_model_parse() {
        assert_eq!("committer".parse::<TrustModel>(), Ok(TrustModel::Committer));
        assert_eq!(
            "CollaboratorCommitter".parse::<TrustModel>(),
            Ok(TrustModel::CollaboratorCommitter)
        );
        assert!("default".parse::<TrustModel>().is_err());
    }
}
