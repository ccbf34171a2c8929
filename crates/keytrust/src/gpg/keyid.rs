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

//! Key id helpers.

use sequoia_openpgp::packet::Signature;
use sequoia_openpgp::KeyHandle;

/// Left-pad a key id with zeros to the 16 character external form.
pub fn padded_key_id(key_id: &str) -> String {
    format!("{:0>16}", key_id.to_uppercase())
}

/// The 16 hex character key id carried in the last eight bytes of a v4
/// fingerprint. Empty when the fingerprint is too short to hold one.
pub fn key_id_from_fingerprint_bytes(fingerprint: &[u8]) -> String {
    if fingerprint.len() < 8 {
        return String::new();
    }
    hex::encode_upper(&fingerprint[fingerprint.len() - 8..])
}

/// The issuer hint of a signature: the issuer key id subpacket when present
/// and non-zero, else the key id derived from the issuer fingerprint, else
/// an empty string.
pub fn issuer_key_id(sig: &Signature) -> String {
    let issuers = sig.get_issuers();

    let explicit = issuers.iter().find_map(|handle| match handle {
        KeyHandle::KeyID(id) if id.as_bytes().iter().any(|b| *b != 0) => Some(id.to_hex()),
        _ => None,
    });
    if let Some(id) = explicit {
        return id;
    }

    issuers
        .iter()
        .find_map(|handle| match handle {
            KeyHandle::Fingerprint(fp) => {
                let id = key_id_from_fingerprint_bytes(fp.as_bytes());
                (!id.is_empty()).then_some(id)
            }
            _ => None,
        })
        .unwrap_or_default()
}
