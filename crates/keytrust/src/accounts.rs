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

//! The account collaborator.

use crate::error::KeyError;
use crate::models::{EmailAddress, User};
use parking_lot::RwLock;
use std::collections::HashSet;

/// Read-only queries against the account system.
///
/// Lookups that find nothing return `Ok(None)`; an `Err` means the lookup
/// itself failed.
pub trait AccountDirectory: Send + Sync {
    fn user_by_id(&self, id: i64) -> Result<Option<User>, KeyError>;

    /// Find the account owning `email` as its primary or an activated address.
    fn user_by_email(&self, email: &str) -> Result<Option<User>, KeyError>;

    fn email_addresses(&self, user_id: i64) -> Result<Vec<EmailAddress>, KeyError>;

    /// Whether `user` administers repository `repo_id`.
    fn is_repo_admin(&self, user: &User, repo_id: i64) -> Result<bool, KeyError>;

    /// Whether the external auth source synchronises SSH keys from upstream.
    fn auth_source_syncs_keys(&self, source_id: i64) -> Result<bool, KeyError>;
}

/// The activated addresses of a user.
pub fn activated_emails(
    accounts: &dyn AccountDirectory,
    user_id: i64,
) -> Result<Vec<EmailAddress>, KeyError> {
    Ok(accounts
        .email_addresses(user_id)?
        .into_iter()
        .filter(|e| e.is_activated)
        .collect())
}

#[derive(Debug, Default)]
struct Directory {
    users: Vec<User>,
    emails: Vec<EmailAddress>,
    repo_admins: HashSet<(i64, i64)>,
    syncing_sources: HashSet<i64>,
}

/// An [`AccountDirectory`] held in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    inner: RwLock<Directory>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user` together with its primary address, activated.
    pub fn add_user(&self, user: User) {
        let mut inner = self.inner.write();
        let mut primary = EmailAddress::new(user.id, user.email.clone(), true);
        primary.is_primary = true;
        primary.id = inner.emails.len() as i64 + 1;
        inner.emails.push(primary);
        inner.users.push(user);
    }

    pub fn add_email(&self, uid: i64, email: &str, is_activated: bool) -> EmailAddress {
        let mut inner = self.inner.write();
        let mut address = EmailAddress::new(uid, email, is_activated);
        address.id = inner.emails.len() as i64 + 1;
        inner.emails.push(address.clone());
        address
    }

    pub fn grant_repo_admin(&self, user_id: i64, repo_id: i64) {
        self.inner.write().repo_admins.insert((user_id, repo_id));
    }

    pub fn set_source_syncs_keys(&self, source_id: i64) {
        self.inner.write().syncing_sources.insert(source_id);
    }
}

impl AccountDirectory for InMemoryAccounts {
    fn user_by_id(&self, id: i64) -> Result<Option<User>, KeyError> {
        Ok(self.inner.read().users.iter().find(|u| u.id == id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, KeyError> {
        let inner = self.inner.read();
        let lower = email.to_lowercase();
        let owner = inner
            .emails
            .iter()
            .find(|e| e.lower_email == lower && (e.is_activated || e.is_primary))
            .map(|e| e.uid);
        Ok(owner.and_then(|uid| inner.users.iter().find(|u| u.id == uid).cloned()))
    }

    fn email_addresses(&self, user_id: i64) -> Result<Vec<EmailAddress>, KeyError> {
        Ok(self
            .inner
            .read()
            .emails
            .iter()
            .filter(|e| e.uid == user_id)
            .cloned()
            .collect())
    }

    fn is_repo_admin(&self, user: &User, repo_id: i64) -> Result<bool, KeyError> {
        Ok(self.inner.read().repo_admins.contains(&(user.id, repo_id)))
    }

    fn auth_source_syncs_keys(&self, source_id: i64) -> Result<bool, KeyError> {
        Ok(self.inner.read().syncing_sources.contains(&source_id))
    }
}
