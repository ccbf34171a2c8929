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

//! Account records as seen by this crate.
//!
//! Accounts are owned by the account collaborator; these are read-only views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account, or a synthetic placeholder for an identity with no account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// 0 for placeholders.
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
    pub keep_email_private: bool,
}

impl User {
    /// A placeholder for a name/email pair not backed by an account.
    pub fn placeholder(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
            created_at: DateTime::<Utc>::default(),
            is_admin: false,
            keep_email_private: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == 0
    }

    pub fn lower_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// The address shown publicly: the no-reply alias when the user hides
    /// their email.
    pub fn display_email(&self, no_reply_address: &str) -> String {
        if self.keep_email_private {
            format!("{}@{}", self.lower_name(), no_reply_address)
        } else {
            self.email.clone()
        }
    }
}

/// An email address registered on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub id: i64,
    pub uid: i64,
    pub email: String,
    pub lower_email: String,
    pub is_activated: bool,
    pub is_primary: bool,
}

impl EmailAddress {
    pub fn new(uid: i64, email: impl Into<String>, is_activated: bool) -> Self {
        let email = email.into();
        Self {
            id: 0,
            uid,
            lower_email: email.to_lowercase(),
            email,
            is_activated,
            is_primary: false,
        }
    }
}
