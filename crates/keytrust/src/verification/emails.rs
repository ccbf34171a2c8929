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

//! Email eligibility of candidate keys.

use crate::accounts::AccountDirectory;
use crate::models::GpgKey;

/// Case-insensitive email comparison.
pub fn emails_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn wanted(expected: &str, candidate: &str) -> bool {
    expected.is_empty() || emails_match(candidate, expected)
}

/// Whether any of `keys` may vouch for `email`, and the address that does.
///
/// A key qualifies through an activated email bound to it. A verified key
/// owned by an account also qualifies through the owner's activated
/// addresses, or through the owner's no-reply alias when the owner hides
/// their email. An empty `email` accepts any address.
pub fn check_key_emails(
    accounts: &dyn AccountDirectory,
    no_reply_address: &str,
    email: &str,
    keys: &[&GpgKey],
) -> (bool, String) {
    let mut loaded_owner = 0;
    let mut owner_emails = Vec::new();
    let mut owner = None;

    for key in keys {
        if let Some(bound) = key
            .emails
            .iter()
            .find(|e| e.is_activated && wanted(email, &e.email))
        {
            return (true, bound.email.clone());
        }

        if !key.verified || key.owner_id == 0 {
            continue;
        }

        if loaded_owner != key.owner_id {
            loaded_owner = key.owner_id;
            owner_emails = accounts
                .email_addresses(key.owner_id)
                .unwrap_or_else(|e| {
                    tracing::warn!("Loading emails of user {}: {}", key.owner_id, e);
                    Vec::new()
                });
            owner = accounts.user_by_id(key.owner_id).unwrap_or_else(|e| {
                tracing::warn!("Loading user {}: {}", key.owner_id, e);
                None
            });
        }

        if let Some(found) = owner_emails
            .iter()
            .find(|e| e.is_activated && wanted(email, &e.email))
        {
            return (true, found.email.clone());
        }

        if let Some(user) = owner.as_ref().filter(|u| u.keep_email_private) {
            let alias = user.display_email(no_reply_address);
            if emails_match(email, &alias) {
                return (true, alias);
            }
        }
    }

    (false, email.to_string())
}
