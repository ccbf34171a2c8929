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

//! Building [`GpgKey`] records from parsed certificates.

use super::armor::encode_public_key;
use crate::error::KeyError;
use crate::models::{EmailAddress, GpgKey};
use chrono::{DateTime, Utc};
use sequoia_openpgp as openpgp;
use openpgp::cert::prelude::*;
use openpgp::packet::UserID;
use openpgp::policy::StandardPolicy;
use openpgp::types::RevocationStatus;
use openpgp::Packet;
use std::time::{Duration, SystemTime};

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

fn expiry(created: SystemTime, lifetime: Option<Duration>) -> Option<DateTime<Utc>> {
    lifetime
        .filter(|d| !d.is_zero())
        .map(|d| to_utc(created + d))
}

/// Expiry of the primary key, read from the newest self-signature of the
/// user id flagged primary, else of the first user id.
pub fn primary_expiry(cert: &Cert) -> Option<DateTime<Utc>> {
    let mut chosen: Option<Option<Duration>> = None;
    for ua in cert.userids() {
        let Some(sig) = ua.self_signatures().into_iter().next() else {
            continue;
        };
        let lifetime = sig.key_validity_period();
        if chosen.is_none() {
            chosen = Some(lifetime);
        } else if sig.primary_userid().unwrap_or(false) {
            chosen = Some(lifetime);
            break;
        }
    }
    expiry(cert.primary_key().key().creation_time(), chosen.flatten())
}

/// The address part of a user id, lowercased and trimmed.
pub fn identity_email(userid: &UserID) -> String {
    let value = String::from_utf8_lossy(userid.value());
    let value = value.trim();
    let email = match (value.rfind('<'), value.rfind('>')) {
        (Some(start), Some(end)) if start < end => &value[start + 1..end],
        _ if value.contains('@') && !value.contains(char::is_whitespace) => value,
        _ => "",
    };
    email.trim().to_lowercase()
}

/// Whether a user id is revoked as of now. A binding the policy rejects
/// counts as not revoked.
fn is_revoked(ua: &UserIDAmalgamation<'_>, policy: &StandardPolicy<'_>) -> bool {
    match ua.clone().with_policy(policy, None) {
        Ok(valid) => matches!(valid.revocation_status(), RevocationStatus::Revoked(_)),
        Err(_) => false,
    }
}

/// Build the record for `cert` and its subkeys without matching emails.
///
/// Used for keys that are not stored against an account, such as the
/// installation signing key.
pub fn transient_gpg_key(owner_id: i64, cert: &Cert) -> Result<GpgKey, KeyError> {
    let primary = cert.primary_key().key();
    let primary_expiry = primary_expiry(cert);
    let key_id = cert.keyid().to_hex();
    let now = Utc::now();

    let mut sub_keys = Vec::new();
    for ka in cert.keys().subkeys() {
        let key = ka.key();
        let lifetime = ka
            .self_signatures()
            .into_iter()
            .next()
            .and_then(|sig| sig.key_validity_period());
        let algo = key.pk_algo();
        sub_keys.push(GpgKey {
            id: 0,
            owner_id,
            key_id: key.keyid().to_hex(),
            primary_key_id: key_id.clone(),
            content: encode_public_key(Packet::from(key.clone()))?,
            created_at: to_utc(key.creation_time()),
            expired_at: expiry(key.creation_time(), lifetime).or(primary_expiry),
            added_at: now,
            emails: Vec::new(),
            verified: false,
            can_sign: algo.for_signing(),
            can_encrypt_comms: algo.for_encryption(),
            can_encrypt_storage: algo.for_encryption(),
            can_certify: algo.for_signing(),
            sub_keys: Vec::new(),
        });
    }

    let algo = primary.pk_algo();
    Ok(GpgKey {
        id: 0,
        owner_id,
        key_id,
        primary_key_id: String::new(),
        content: encode_public_key(Packet::from(primary.clone()))?,
        created_at: to_utc(primary.creation_time()),
        expired_at: primary_expiry,
        added_at: now,
        emails: Vec::new(),
        verified: false,
        can_sign: algo.for_signing(),
        can_encrypt_comms: algo.for_encryption(),
        can_encrypt_storage: algo.for_encryption(),
        can_certify: algo.for_signing(),
        sub_keys,
    })
}

/// Build the record for `cert` owned by `owner_id`.
///
/// `owner_emails` are the owner's registered addresses; each non-revoked
/// identity whose email equals an activated address binds that address to
/// the key. Unless `verified`, a key binding no address is rejected with
/// every identity email listed.
pub fn parse_gpg_key(
    owner_id: i64,
    cert: &Cert,
    verified: bool,
    owner_emails: &[EmailAddress],
) -> Result<GpgKey, KeyError> {
    let policy = StandardPolicy::new();

    let mut emails: Vec<EmailAddress> = Vec::new();
    let mut failed: Vec<String> = Vec::new();
    for ua in cert.userids() {
        let email = identity_email(ua.userid());
        failed.push(email.clone());
        if is_revoked(&ua, &policy) {
            tracing::debug!("Skipping revoked identity {} of {}", email, cert.keyid());
            continue;
        }
        if let Some(found) = owner_emails
            .iter()
            .find(|e| e.is_activated && e.lower_email == email)
        {
            if !emails.iter().any(|e| e.id == found.id && e.email == found.email) {
                emails.push(found.clone());
            }
        }
    }

    if !verified && emails.is_empty() {
        return Err(KeyError::NoEmailFound { emails: failed });
    }

    let mut key = transient_gpg_key(owner_id, cert)?;
    key.emails = emails;
    key.verified = verified;
    Ok(key)
}
