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

//! Conversion of PEM-encoded public keys to OpenSSH lines.
//!
//! Two DER layouts are accepted:
//! - SubjectPublicKeyInfo (`PUBLIC KEY`): RSA, DSA, NIST P-256/384/521 and Ed25519
//! - PKCS#1 `RSAPublicKey`, tried when SubjectPublicKeyInfo does not parse
//!
//! Any block whose tag mentions `PRIVATE` is rejected before decoding.

use crate::error::KeyError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use der::asn1::UintRef;
use der::{Decode, Sequence};
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use ssh_key::public::{DsaPublicKey, EcdsaPublicKey, Ed25519PublicKey, KeyData, RsaPublicKey};
use ssh_key::{Mpint, PublicKey};

const OID_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

const OID_P256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_P384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const OID_P521: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

/// DSA domain parameters from the algorithm identifier (RFC 3279).
#[derive(Sequence)]
struct DssParms<'a> {
    p: UintRef<'a>,
    q: UintRef<'a>,
    g: UintRef<'a>,
}

fn invalid(e: impl std::fmt::Display) -> KeyError {
    KeyError::InvalidKey(e.to_string())
}

fn mpint(value: UintRef<'_>) -> Result<Mpint, KeyError> {
    Mpint::from_positive_bytes(value.as_bytes()).map_err(invalid)
}

/// Decode a PEM block into a single OpenSSH line (`<type> <base64>\n`).
pub fn pem_to_authorized_key(content: &str) -> Result<String, KeyError> {
    let block = pem::parse(content).map_err(|e| {
        KeyError::InvalidKey(format!(
            "failed to parse PEM block containing the public key: {}",
            e
        ))
    })?;
    if block.tag().contains("PRIVATE") {
        return Err(KeyError::InvalidKey(
            "a private key was supplied where a public key is expected".to_string(),
        ));
    }

    let key_data = match subject_public_key_info(block.contents()) {
        Ok(key_data) => key_data,
        Err(pkix_err) => pkcs1_rsa(block.contents()).map_err(|pkcs1_err| {
            KeyError::InvalidKey(format!(
                "failed to parse DER encoded public key as either PKIX or PKCS#1 RSA: {} {}",
                pkix_err, pkcs1_err
            ))
        })?,
    };

    let algorithm = key_data.algorithm();
    let blob = PublicKey::from(key_data).to_bytes().map_err(invalid)?;
    Ok(format!("{} {}\n", algorithm.as_str(), STANDARD.encode(blob)))
}

fn subject_public_key_info(der: &[u8]) -> Result<KeyData, KeyError> {
    let spki = SubjectPublicKeyInfoRef::from_der(der).map_err(invalid)?;
    let key = spki.subject_public_key.as_bytes().ok_or_else(|| {
        KeyError::InvalidKey("public key bit string has unused bits".to_string())
    })?;

    let oid = spki.algorithm.oid;
    if oid == OID_RSA {
        pkcs1_rsa(key)
    } else if oid == OID_DSA {
        let params = spki
            .algorithm
            .parameters
            .ok_or_else(|| KeyError::InvalidKey("missing DSA parameters".to_string()))?
            .decode_as::<DssParms<'_>>()
            .map_err(invalid)?;
        let y = UintRef::from_der(key).map_err(invalid)?;
        Ok(KeyData::Dsa(DsaPublicKey {
            p: mpint(params.p)?,
            q: mpint(params.q)?,
            g: mpint(params.g)?,
            y: mpint(y)?,
        }))
    } else if oid == OID_EC_PUBLIC_KEY {
        let curve = spki.algorithm.parameters_oid().map_err(invalid)?;
        let expected = if curve == OID_P256 {
            "nistp256"
        } else if curve == OID_P384 {
            "nistp384"
        } else if curve == OID_P521 {
            "nistp521"
        } else {
            return Err(KeyError::InvalidKey("unsupported elliptic curve".to_string()));
        };
        if key.first() != Some(&0x04) {
            return Err(KeyError::InvalidKey(
                "only uncompressed curve points are supported".to_string(),
            ));
        }
        let ecdsa = EcdsaPublicKey::from_sec1_bytes(key).map_err(invalid)?;
        if ecdsa.curve().as_str() != expected {
            return Err(KeyError::InvalidKey(format!(
                "curve point does not match {}",
                expected
            )));
        }
        Ok(KeyData::Ecdsa(ecdsa))
    } else if oid == OID_ED25519 {
        let bytes = <[u8; 32]>::try_from(key).map_err(|_| {
            KeyError::InvalidKey(format!(
                "ed25519 public key must be 32 bytes, got {}",
                key.len()
            ))
        })?;
        Ok(KeyData::Ed25519(Ed25519PublicKey(bytes)))
    } else {
        Err(KeyError::InvalidKey(
            "unsupported public key algorithm".to_string(),
        ))
    }
}

fn pkcs1_rsa(der: &[u8]) -> Result<KeyData, KeyError> {
    let key = pkcs1::RsaPublicKey::from_der(der).map_err(invalid)?;
    Ok(KeyData::Rsa(RsaPublicKey {
        e: mpint(key.public_exponent)?,
        n: mpint(key.modulus)?,
    }))
}
