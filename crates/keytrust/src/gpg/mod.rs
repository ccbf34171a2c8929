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

//! OpenPGP key handling.
//!
//! This module provides:
//! - Parsing of armored key blocks and detached signatures
//! - Key id helpers and signature issuer extraction
//! - Building [`GpgKey`](crate::models::GpgKey) records with their subkeys
//!   and the account emails their identities bind
//! - Hash-and-verify of signatures against stored key records

mod armor;
mod keyid;
mod record;
mod verify;

pub use armor::{
    check_armored_gpg_key_string, coalesce_certs, decode_public_key, encode_public_key,
    extract_signature, StoredKey,
};
pub use keyid::{issuer_key_id, key_id_from_fingerprint_bytes, padded_key_id};
pub use record::{identity_email, parse_gpg_key, primary_expiry, transient_gpg_key};
pub use verify::{
    check_detached_signature, hash_and_verify, hash_and_verify_with_sub_keys, token_variants,
    verify_token_signature,
};
