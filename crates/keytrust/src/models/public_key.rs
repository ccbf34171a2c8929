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

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// What an SSH public key row is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Authenticates the owning account.
    User,
    /// Grants access to one or more repositories.
    Deploy,
    /// An SSH certificate principal rather than a key.
    Principal,
}

impl KeyType {
    pub fn as_i32(self) -> i32 {
        match self {
            KeyType::User => 1,
            KeyType::Deploy => 2,
            KeyType::Principal => 3,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(KeyType::User),
            2 => Some(KeyType::Deploy),
            3 => Some(KeyType::Principal),
            _ => None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::User => "user",
            KeyType::Deploy => "deploy",
            KeyType::Principal => "principal",
        };
        f.write_str(name)
    }
}

/// Access level granted by a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessMode {
    None,
    Read,
    Write,
    Admin,
    Owner,
}

impl AccessMode {
    pub fn as_i32(self) -> i32 {
        match self {
            AccessMode::None => 0,
            AccessMode::Read => 1,
            AccessMode::Write => 2,
            AccessMode::Admin => 3,
            AccessMode::Owner => 4,
        }
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => AccessMode::Read,
            2 => AccessMode::Write,
            3 => AccessMode::Admin,
            4 => AccessMode::Owner,
            _ => AccessMode::None,
        }
    }
}

/// An SSH public key (user, deploy or principal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    /// `SHA256:<base64-no-padding>`; empty for principals.
    pub fingerprint: String,
    /// Canonical single-line OpenSSH form, or the principal string.
    pub content: String,
    pub mode: AccessMode,
    pub key_type: KeyType,
    /// External authentication source that manages the key, 0 if none.
    pub login_source_id: i64,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PublicKey {
    /// Whether the key was used since it was added.
    pub fn has_used(&self) -> bool {
        self.updated_at > self.created_at
    }

    /// Whether the key was used within the last seven days.
    pub fn has_recent_activity(&self, now: DateTime<Utc>) -> bool {
        self.updated_at + Duration::days(7) > now
    }

    /// The content without its trailing comment.
    pub fn omit_email(&self) -> String {
        let mut fields = self.content.splitn(3, ' ');
        match (fields.next(), fields.next()) {
            (Some(key_type), Some(data)) => format!("{} {}", key_type, data),
            _ => self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(created: DateTime<Utc>, updated: DateTime<Utc>) -> PublicKey {
        PublicKey {
            id: 1,
            owner_id: 1,
            name: "laptop".to_string(),
            fingerprint: "SHA256:abc".to_string(),
            content: "ssh-ed25519 AAAAC3Nza user@host".to_string(),
            mode: AccessMode::Write,
            key_type: KeyType::User,
            login_source_id: 0,
            verified: false,
            created_at: created,
            updated_at: updated,
        }
    }

    #[test]
    fn test_activity_flags() {
        let now = Utc::now();
        let fresh = key(now, now);
        assert!(!fresh.has_used());
        assert!(fresh.has_recent_activity(now));

        let stale = key(now - Duration::days(30), now - Duration::days(10));
        assert!(stale.has_used());
        assert!(!stale.has_recent_activity(now));
    }

    #[test]
    fn test_omit_email() {
        let now = Utc::now();
        assert_eq!(key(now, now).omit_email(), "ssh-ed25519 AAAAC3Nza");
    }

    #[test]
    fn test_key_type_round_trip_values() {
        for key_type in [KeyType::User, KeyType::Deploy, KeyType::Principal] {
            assert_eq!(KeyType::from_i32(key_type.as_i32()), Some(key_type));
        }
        assert_eq!(KeyType::from_i32(9), None);
    }
}
