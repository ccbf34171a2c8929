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

//! Signature verification against stored key records.

use super::armor::{decode_public_key, extract_signature};
use crate::error::KeyError;
use crate::models::GpgKey;
use sequoia_openpgp::cert::Cert;
use sequoia_openpgp::packet::Signature;

/// Verify `sig` over `payload` with the single key `key`.
///
/// `Ok(None)` means "not this key": the key cannot sign, its stored content
/// does not decode, or the signature does not match. An error means the
/// payload could not be hashed at all.
pub fn hash_and_verify<'k>(
    sig: &Signature,
    payload: &[u8],
    key: &'k GpgKey,
) -> Result<Option<&'k GpgKey>, KeyError> {
    let algo = sig.hash_algo();
    if !algo.is_supported() {
        return Err(KeyError::Parsing(format!(
            "unsupported hash algorithm {}",
            algo
        )));
    }

    if !key.can_sign {
        tracing::debug!("Key {} can not sign", key.key_id);
        return Ok(None);
    }

    let public = match decode_public_key(&key.content) {
        Ok(public) => public,
        Err(e) => {
            tracing::debug!("Stored content of key {} is unusable: {}", key.key_id, e);
            return Ok(None);
        }
    };

    let mut sig = sig.clone();
    match sig.verify_message(&public, payload) {
        Ok(()) => Ok(Some(key)),
        Err(_) => Ok(None),
    }
}

/// [`hash_and_verify`] against `key`, then each of its subkeys in order.
pub fn hash_and_verify_with_sub_keys<'k>(
    sig: &Signature,
    payload: &[u8],
    key: &'k GpgKey,
) -> Result<Option<&'k GpgKey>, KeyError> {
    if let Some(found) = hash_and_verify(sig, payload, key)? {
        return Ok(Some(found));
    }
    for sub in &key.sub_keys {
        if let Some(found) = hash_and_verify(sig, payload, sub)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Find the certificate whose key made the detached signature over `message`.
pub fn check_detached_signature<'c>(
    certs: &'c [Cert],
    message: &[u8],
    armored: &str,
) -> Result<&'c Cert, KeyError> {
    let sig = extract_signature(armored)?;
    let issuers = sig.get_issuers();

    for cert in certs {
        for ka in cert.keys() {
            let key = ka.key();
            let handle = key.key_handle();
            if !issuers.is_empty() && !issuers.iter().any(|issuer| issuer.aliases(&handle)) {
                continue;
            }
            let mut candidate = sig.clone();
            if candidate.verify_message(key, message).is_ok() {
                return Ok(cert);
            }
        }
    }

    Err(KeyError::Parsing(
        "signature made by unknown entity".to_string(),
    ))
}

/// The line-ending variants of a challenge token tried when checking an
/// ownership proof.
pub fn token_variants(token: &str) -> [String; 3] {
    [
        token.to_string(),
        format!("{}\n", token),
        format!("{}\r\n", token),
    ]
}

/// [`check_detached_signature`] over each variant of `token`; the first
/// variant that verifies wins.
pub fn verify_token_signature<'c>(
    certs: &'c [Cert],
    token: &str,
    armored: &str,
) -> Result<&'c Cert, KeyError> {
    let mut last = None;
    for candidate in token_variants(token) {
        match check_detached_signature(certs, candidate.as_bytes(), armored) {
            Ok(cert) => return Ok(cert),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| KeyError::Parsing("no token variant verified".to_string())))
}
