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

//! Security audit logging for key lifecycle and verification.
//!
//! This module provides structured audit events for:
//! - GPG, SSH, deploy and principal key changes
//! - Ownership proofs
//! - Authorized-keys file rewrites
//! - Commit verification outcomes
//!
//! Every event carries an `event_type` field so log pipelines can filter on it.

/// Event types.
pub mod events {
    pub const GPG_KEY_ADDED: &str = "key.gpg.added";
    pub const GPG_KEY_ADD_FAILED: &str = "key.gpg.add_failed";
    pub const GPG_KEY_DELETED: &str = "key.gpg.deleted";
    pub const GPG_KEY_VERIFIED: &str = "key.gpg.verified";

    pub const SSH_KEY_ADDED: &str = "key.ssh.added";
    pub const SSH_KEY_DELETED: &str = "key.ssh.deleted";
    pub const SSH_KEY_VERIFIED: &str = "key.ssh.verified";

    pub const DEPLOY_KEY_ADDED: &str = "key.deploy.added";
    pub const DEPLOY_KEY_DELETED: &str = "key.deploy.deleted";
    pub const PRINCIPAL_ADDED: &str = "key.principal.added";

    /// A signature over an ownership token did not verify.
    pub const OWNERSHIP_PROOF_FAILED: &str = "key.ownership.proof_failed";

    pub const AUTHORIZED_KEYS_REWRITTEN: &str = "authorized_keys.rewritten";
    pub const AUTHORIZED_PRINCIPALS_REWRITTEN: &str = "authorized_principals.rewritten";

    pub const COMMIT_VERIFIED: &str = "commit.verified";
    pub const COMMIT_UNVERIFIED: &str = "commit.unverified";
}

/// Log a GPG key import.
pub fn log_gpg_key_added(owner_id: i64, key_id: &str, sub_keys: usize, verified: bool) {
    tracing::info!(
        event_type = events::GPG_KEY_ADDED,
        owner_id = owner_id,
        key_id = %key_id,
        sub_keys = sub_keys,
        verified = verified,
        "GPG key added"
    );
}

pub fn log_gpg_key_add_failed(owner_id: i64, error: &str) {
    tracing::warn!(
        event_type = events::GPG_KEY_ADD_FAILED,
        owner_id = owner_id,
        error = %error,
        "Failed to add GPG key"
    );
}

pub fn log_gpg_key_deleted(owner_id: i64, key_id: &str, rows: usize) {
    tracing::info!(
        event_type = events::GPG_KEY_DELETED,
        owner_id = owner_id,
        key_id = %key_id,
        rows = rows,
        "GPG key deleted"
    );
}

pub fn log_gpg_key_verified(owner_id: i64, key_id: &str) {
    tracing::info!(
        event_type = events::GPG_KEY_VERIFIED,
        owner_id = owner_id,
        key_id = %key_id,
        "GPG key ownership verified"
    );
}

pub fn log_ssh_key_added(owner_id: i64, key_id: i64, fingerprint: &str, key_type: &str) {
    tracing::info!(
        event_type = events::SSH_KEY_ADDED,
        owner_id = owner_id,
        key_id = key_id,
        key_fingerprint = %fingerprint,
        key_type = %key_type,
        "SSH key added"
    );
}

pub fn log_ssh_key_deleted(doer_id: i64, key_id: i64, fingerprint: &str) {
    tracing::info!(
        event_type = events::SSH_KEY_DELETED,
        doer_id = doer_id,
        key_id = key_id,
        key_fingerprint = %fingerprint,
        "SSH key deleted"
    );
}

pub fn log_ssh_key_verified(owner_id: i64, fingerprint: &str) {
    tracing::info!(
        event_type = events::SSH_KEY_VERIFIED,
        owner_id = owner_id,
        key_fingerprint = %fingerprint,
        "SSH key ownership verified"
    );
}

pub fn log_deploy_key_added(repo_id: i64, deploy_key_id: i64, fingerprint: &str, read_only: bool) {
    tracing::info!(
        event_type = events::DEPLOY_KEY_ADDED,
        repo_id = repo_id,
        deploy_key_id = deploy_key_id,
        key_fingerprint = %fingerprint,
        read_only = read_only,
        "Deploy key added"
    );
}

pub fn log_deploy_key_deleted(doer_id: i64, repo_id: i64, deploy_key_id: i64, key_removed: bool) {
    tracing::info!(
        event_type = events::DEPLOY_KEY_DELETED,
        doer_id = doer_id,
        repo_id = repo_id,
        deploy_key_id = deploy_key_id,
        key_removed = key_removed,
        "Deploy key deleted"
    );
}

pub fn log_principal_added(owner_id: i64, key_id: i64, principal: &str) {
    tracing::info!(
        event_type = events::PRINCIPAL_ADDED,
        owner_id = owner_id,
        key_id = key_id,
        principal = %principal,
        "SSH principal added"
    );
}

/// Log a rejected ownership proof. `subject` is a GPG key id or SSH fingerprint.
pub fn log_ownership_proof_failed(owner_id: i64, subject: &str, reason: &str) {
    tracing::warn!(
        event_type = events::OWNERSHIP_PROOF_FAILED,
        owner_id = owner_id,
        subject = %subject,
        reason = %reason,
        "Ownership proof rejected"
    );
}

pub fn log_authorized_file_rewritten(principals: bool, path: &str, entries: usize) {
    let event_type = if principals {
        events::AUTHORIZED_PRINCIPALS_REWRITTEN
    } else {
        events::AUTHORIZED_KEYS_REWRITTEN
    };
    tracing::info!(
        event_type = event_type,
        path = %path,
        entries = entries,
        "Authorized file rewritten"
    );
}

pub fn log_commit_verified(commit_id: &str, signer: &str, key: &str) {
    tracing::info!(
        event_type = events::COMMIT_VERIFIED,
        commit_id = %commit_id,
        signer = %signer,
        key = %key,
        "Commit signature verified"
    );
}

/// Unverified commits are routine, so this logs at debug.
pub fn log_commit_unverified(commit_id: &str, reason: &str, warning: bool) {
    tracing::debug!(
        event_type = events::COMMIT_UNVERIFIED,
        commit_id = %commit_id,
        reason = %reason,
        warning = warning,
        "Commit signature not verified"
    );
}
