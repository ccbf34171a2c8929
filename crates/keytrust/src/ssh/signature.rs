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

//! SSHSIG envelope verification.

use crate::error::KeyError;
use ssh_key::SshSig;

/// Namespace git uses when signing commits and tags.
pub const GIT_NAMESPACE: &str = "git";

/// Namespace for ownership-proof signatures over a challenge token.
pub const OWNERSHIP_NAMESPACE: &str = "gitea";

const SSH_SIGNATURE_BEGIN: &str = "-----BEGIN SSH SIGNATURE-----";

pub fn is_ssh_signature(signature: &str) -> bool {
    signature.trim_start().starts_with(SSH_SIGNATURE_BEGIN)
}

/// Verify an armored SSHSIG over `payload` against an OpenSSH public key.
///
/// Returns `Ok(false)` when the signature is well formed but does not
/// verify under `key_content` and `namespace`; malformed input is an error.
pub fn verify_ssh_signature(
    key_content: &str,
    armored: &str,
    payload: &[u8],
    namespace: &str,
) -> Result<bool, KeyError> {
    let key = ssh_key::PublicKey::from_openssh(key_content.trim())
        .map_err(|e| KeyError::InvalidKey(format!("invalid ssh public key: {}", e)))?;
    let signature = SshSig::from_pem(armored.trim())
        .map_err(|e| KeyError::Parsing(format!("invalid ssh signature: {}", e)))?;

    match key.verify(namespace, payload, &signature) {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::debug!(
                "SSH signature did not verify with {}: {}",
                key.fingerprint(ssh_key::HashAlg::Sha256),
                e
            );
            Ok(false)
        }
    }
}
