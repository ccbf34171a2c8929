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

//! Algorithm family and size of decoded SSH public keys.

use crate::error::KeyError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ssh_key::public::KeyData;
use ssh_key::{Mpint, PublicKey};

/// Algorithm family and bit length as reported for minimum-size checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub family: &'static str,
    pub bits: u32,
}

fn mpint_bits(value: &Mpint) -> u32 {
    match value.as_positive_bytes() {
        Some([first, rest @ ..]) => rest.len() as u32 * 8 + (8 - first.leading_zeros()),
        _ => 0,
    }
}

/// Family and size of a decoded key.
pub fn key_info(key: &KeyData) -> Result<KeyInfo, KeyError> {
    let info = match key {
        KeyData::Dsa(dsa) => KeyInfo {
            family: "dsa",
            bits: mpint_bits(&dsa.p),
        },
        KeyData::Rsa(rsa) => KeyInfo {
            family: "rsa",
            bits: mpint_bits(&rsa.n),
        },
        KeyData::Ecdsa(ecdsa) => {
            let bits = match ecdsa.curve().as_str() {
                "nistp256" => 256,
                "nistp384" => 384,
                "nistp521" => 521,
                other => {
                    return Err(KeyError::InvalidKey(format!("unknown curve {}", other)));
                }
            };
            KeyInfo {
                family: "ecdsa",
                bits,
            }
        }
        KeyData::Ed25519(_) => KeyInfo {
            family: "ed25519",
            bits: 256,
        },
        KeyData::SkEcdsaSha2NistP256(_) => KeyInfo {
            family: "ecdsa-sk",
            bits: 256,
        },
        KeyData::SkEd25519(_) => KeyInfo {
            family: "ed25519-sk",
            bits: 256,
        },
        other => {
            return Err(KeyError::InvalidKey(format!(
                "unsupported key length detection for type: {}",
                other.algorithm()
            )));
        }
    };
    Ok(info)
}

/// Decode a wire-format public key blob.
pub fn decode_blob(blob: &[u8]) -> Result<PublicKey, KeyError> {
    PublicKey::from_bytes(blob)
        .map_err(|e| KeyError::InvalidKey(format!("invalid key format: {}", e)))
}

/// The algorithm name of a base64 key blob.
pub fn extract_type_from_base64_key(key: &str) -> Result<String, KeyError> {
    let blob = STANDARD
        .decode(key)
        .map_err(|e| KeyError::InvalidKey(format!("invalid key format: {}", e)))?;
    Ok(decode_blob(&blob)?.algorithm().as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ED25519: &str = "AAAAC3NzaC1lZDI1NTE5AAAAICV0MGX/W9IvLA4FXpIuUcdDcbj5KX4syHgsTy7soVgf";

    #[test]
    fn test_mpint_bits() {
        assert_eq!(mpint_bits(&Mpint::from_positive_bytes(&[0x01, 0x00]).unwrap()), 9);
        assert_eq!(mpint_bits(&Mpint::from_positive_bytes(&[0xff]).unwrap()), 8);
    }

    #[test]
    fn test_key_info_ed25519() {
        let blob = STANDARD.decode(ED25519).unwrap();
        let key = decode_blob(&blob).unwrap();
        assert_eq!(
            key_info(key.key_data()).unwrap(),
            KeyInfo {
                family: "ed25519",
                bits: 256
            }
        );
    }

    #[test]
    fn test_extract_type() {
        assert_eq!(extract_type_from_base64_key(ED25519).unwrap(), "ssh-ed25519");
        assert!(extract_type_from_base64_key("test").is_err());
        assert!(extract_type_from_base64_key("gitea").is_err());
    }
}
