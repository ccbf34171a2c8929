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

use super::EmailAddress;
use chrono::{DateTime, Utc};

/// An OpenPGP primary key or subkey bound to an account.
///
/// Subkeys reference their primary through `primary_key_id`; a primary's
/// `sub_keys` are loaded by reverse query and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgKey {
    pub id: i64,
    /// 0 for transient keys built from the installation signing key.
    pub owner_id: i64,
    /// 16 uppercase hex characters.
    pub key_id: String,
    /// Empty for primary keys.
    pub primary_key_id: String,
    /// Base64 of the serialized public key packet.
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub emails: Vec<EmailAddress>,
    pub verified: bool,
    pub can_sign: bool,
    pub can_encrypt_comms: bool,
    pub can_encrypt_storage: bool,
    pub can_certify: bool,
    pub sub_keys: Vec<GpgKey>,
}

impl GpgKey {
    pub fn is_primary(&self) -> bool {
        self.primary_key_id.is_empty()
    }

    /// The key id of the primary key this record belongs to.
    pub fn primary_id(&self) -> &str {
        if self.is_primary() {
            &self.key_id
        } else {
            &self.primary_key_id
        }
    }

    pub fn padded_key_id(&self) -> String {
        crate::gpg::padded_key_id(&self.key_id)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expired_at, Some(expiry) if expiry <= now)
    }

    /// A key with only the key id filled in, used to report which key a
    /// failed verification was looking for.
    pub fn stub(key_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            owner_id: 0,
            key_id: key_id.into(),
            primary_key_id: String::new(),
            content: String::new(),
            created_at: DateTime::<Utc>::default(),
            expired_at: None,
            added_at: DateTime::<Utc>::default(),
            emails: Vec::new(),
            verified: false,
            can_sign: false,
            can_encrypt_comms: false,
            can_encrypt_storage: false,
            can_certify: false,
            sub_keys: Vec::new(),
        }
    }
}

/// The original armored block of an imported key, keyed by primary key id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgKeyImport {
    pub key_id: String,
    pub content: String,
}
