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

//! User-invoked key operations.
//!
//! [`KeyService`] is the entry point for adding, listing, verifying and
//! deleting GPG keys, SSH keys, deploy keys and principals. Every mutation
//! that touches several rows runs in one store transaction; the
//! authorized-keys files are brought up to date after SSH changes.
//!
//! Account lookups happen outside store closures so that a single-connection
//! pool never has to lend a second connection.

mod deploy;
mod gpg;
mod principal;
mod ssh;

use crate::accounts::AccountDirectory;
use crate::authorized_keys::AuthorizedKeysWriter;
use crate::config::KeyTrustConfig;
use crate::dal::KeyStore;
use crate::models::User;
use crate::ownership;
use crate::ssh::{inspector_for, KeyInspector};
use crate::verification::CommitVerifier;
use chrono::Utc;
use std::sync::Arc;

pub struct KeyService {
    store: Arc<dyn KeyStore>,
    accounts: Arc<dyn AccountDirectory>,
    inspector: Arc<dyn KeyInspector>,
    writer: AuthorizedKeysWriter,
    config: Arc<KeyTrustConfig>,
}

impl KeyService {
    /// Build a service, choosing the key inspector from the SSH settings.
    pub fn new(
        store: Arc<dyn KeyStore>,
        accounts: Arc<dyn AccountDirectory>,
        config: Arc<KeyTrustConfig>,
    ) -> Self {
        let inspector = inspector_for(&config.ssh);
        let writer = AuthorizedKeysWriter::new(config.ssh.clone(), config.app.clone());
        Self {
            store,
            accounts,
            inspector,
            writer,
            config,
        }
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn KeyInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn store(&self) -> &dyn KeyStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &KeyTrustConfig {
        &self.config
    }

    pub fn authorized_keys(&self) -> &AuthorizedKeysWriter {
        &self.writer
    }

    /// A commit verifier sharing this service's store, accounts and settings.
    pub fn commit_verifier(&self) -> CommitVerifier {
        CommitVerifier::new(
            self.store.clone(),
            self.accounts.clone(),
            self.inspector.clone(),
            self.config.clone(),
        )
    }

    /// The challenge `user` signs to prove ownership of a key.
    pub fn verification_token(&self, user: &User) -> String {
        ownership::verification_token(user, self.config.service.verification_token_minutes)
    }

    /// Tokens a proof submitted now may have signed, newest first.
    fn accepted_tokens(&self, user: &User) -> [String; 2] {
        ownership::accepted_tokens(
            user,
            self.config.service.verification_token_minutes,
            Utc::now(),
        )
    }
}
