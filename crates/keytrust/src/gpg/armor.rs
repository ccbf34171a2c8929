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

//! Armored key and signature parsing, and the stored packet encoding.

use crate::error::KeyError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sequoia_openpgp as openpgp;
use openpgp::armor;
use openpgp::cert::{Cert, CertParser};
use openpgp::packet::key::{PublicParts, UnspecifiedRole};
use openpgp::packet::{Key, Signature};
use openpgp::parse::Parse;
use openpgp::serialize::SerializeInto;
use openpgp::{Packet, PacketPile};
use std::io::Read;

/// A public key or subkey recovered from its stored encoding.
pub type StoredKey = Key<PublicParts, UnspecifiedRole>;

fn parsing(what: &str, err: impl std::fmt::Display) -> KeyError {
    KeyError::Parsing(format!("{}: {}", what, err))
}

/// Parse an armored (or binary) key block into its certificates.
///
/// Secret key material, if any, is stripped. An input holding no
/// certificate is a parsing error.
pub fn check_armored_gpg_key_string(content: &str) -> Result<Vec<Cert>, KeyError> {
    let parser =
        CertParser::from_bytes(content.as_bytes()).map_err(|e| parsing("reading key block", e))?;

    let mut certs = Vec::new();
    for cert in parser {
        let cert = cert.map_err(|e| parsing("reading key block", e))?;
        certs.push(cert.strip_secret_key_material());
    }

    if certs.is_empty() {
        return Err(KeyError::Parsing("no key found in key block".to_string()));
    }
    Ok(certs)
}

/// Decode an armored detached signature.
pub fn extract_signature(armored: &str) -> Result<Signature, KeyError> {
    let mut reader = armor::Reader::from_bytes(
        armored.trim().as_bytes(),
        armor::ReaderMode::Tolerant(Some(armor::Kind::Signature)),
    );
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| parsing("reading signature armor", e))?;

    let pile = PacketPile::from_bytes(&bytes).map_err(|e| parsing("reading signature", e))?;
    match pile.into_children().next() {
        Some(Packet::Signature(sig)) => Ok(sig),
        Some(other) => Err(KeyError::Parsing(format!(
            "expected a signature packet, got {}",
            other.tag()
        ))),
        None => Err(KeyError::Parsing("empty signature".to_string())),
    }
}

/// Merge certificates that share a primary key id.
///
/// Order of first appearance is kept; user ids and subkeys of later copies
/// are folded into the first.
pub fn coalesce_certs(certs: Vec<Cert>) -> Result<Vec<Cert>, KeyError> {
    let mut merged: Vec<Cert> = Vec::with_capacity(certs.len());
    for cert in certs {
        match merged.iter().position(|c| c.keyid() == cert.keyid()) {
            Some(pos) => {
                let existing = merged.remove(pos);
                let combined = existing
                    .merge_public(cert)
                    .map_err(|e| parsing("merging keys", e))?;
                merged.insert(pos, combined);
            }
            None => merged.push(cert),
        }
    }
    Ok(merged)
}

/// Base64 of a serialized public key packet, the form kept in `GpgKey::content`.
pub fn encode_public_key(packet: Packet) -> Result<String, KeyError> {
    let bytes = packet
        .to_vec()
        .map_err(|e| parsing("serializing public key", e))?;
    Ok(STANDARD.encode(bytes))
}

/// Inverse of [`encode_public_key`].
pub fn decode_public_key(content: &str) -> Result<StoredKey, KeyError> {
    let bytes = STANDARD
        .decode(content)
        .map_err(|e| parsing("decoding public key", e))?;
    let pile = PacketPile::from_bytes(&bytes).map_err(|e| parsing("reading public key", e))?;
    match pile.into_children().next() {
        Some(Packet::PublicKey(key)) => Ok(key.role_into_unspecified()),
        Some(Packet::PublicSubkey(key)) => Ok(key.role_into_unspecified()),
        Some(other) => Err(KeyError::Parsing(format!(
            "expected a public key packet, got {}",
            other.tag()
        ))),
        None => Err(KeyError::Parsing("empty public key".to_string())),
    }
}
