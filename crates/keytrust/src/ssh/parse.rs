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

//! Normalisation of user-supplied SSH public key text.

use super::algorithm::extract_type_from_base64_key;
use super::inspector::KeyInspector;
use super::pkix::pem_to_authorized_key;
use crate::config::SshConfig;
use crate::error::KeyError;
use tracing::{debug, trace};

const SSH2_KEY_START: &str = "---- BEGIN SSH2 PUBLIC KEY ----";

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Reassemble the base64 body of an RFC 4716 block.
///
/// Header lines contain `:`, begin/end markers contain `-`, and a header
/// ending in `\` continues on the next line.
fn ssh2_key_content(content: &str) -> String {
    let mut key_content = String::new();
    let mut continuation = false;
    for line in normalize_line_endings(content).split('\n') {
        if continuation || line.contains(':') || line.contains('-') {
            continuation = line.ends_with('\\');
        } else {
            key_content.push_str(line);
        }
    }
    key_content
}

/// Convert OpenSSH-line, SSH2-block or PEM input into one canonical line
/// `<type> <base64> <comment>`.
///
/// The comment may be empty, leaving a trailing space that
/// [`check_public_key_string`] trims.
pub fn parse_key_string(content: &str) -> Result<String, KeyError> {
    let content = content.trim();

    let (key_type, key_content, key_comment) = if content.starts_with(SSH2_KEY_START) {
        let key_content = ssh2_key_content(content);
        let key_type = extract_type_from_base64_key(&key_content)?;
        (key_type, key_content, String::new())
    } else {
        let converted;
        let mut text = content;
        if content.contains("-----BEGIN") {
            converted = pem_to_authorized_key(&normalize_line_endings(content))?;
            text = &converted;
        }

        let joined = text.replace("\r\n", "").replace('\n', "");
        let mut parts = joined.splitn(3, ' ');
        let (given_type, data, comment) = match (parts.next(), parts.next(), parts.next()) {
            (Some(data), None, _) => ("", data, ""),
            (Some(t), Some(data), None) => (t, data, ""),
            (Some(t), Some(data), Some(comment)) => (t, data, comment),
            (None, _, _) => return Err(KeyError::InvalidKey("empty key".to_string())),
        };

        let decoded_type = extract_type_from_base64_key(data)?;
        if !given_type.is_empty() && given_type != decoded_type {
            return Err(KeyError::InvalidKey(format!(
                "key type and content does not match: {} - {}",
                given_type, decoded_type
            )));
        }
        (decoded_type, data.to_string(), comment.to_string())
    };

    let line = format!("{} {} {}", key_type, key_content, key_comment);
    ssh_key::PublicKey::from_openssh(line.trim_end())
        .map_err(|e| KeyError::InvalidKey(format!("invalid ssh public key: {}", e)))?;
    Ok(line)
}

/// Validate and canonicalise a public key for storage.
///
/// Rejects input spanning several lines and, when size checks are on,
/// keys below the configured minimum for their algorithm or of an
/// algorithm not listed at all.
pub fn check_public_key_string(
    content: &str,
    config: &SshConfig,
    inspector: &dyn KeyInspector,
) -> Result<String, KeyError> {
    if config.disabled {
        return Err(KeyError::SshDisabled);
    }

    let content = parse_key_string(content)?;
    let content = content.trim_end_matches(['\n', '\r']);
    if content.contains(['\n', '\r']) {
        return Err(KeyError::MultipleLines);
    }
    let content = content.trim().to_string();

    if !config.minimum_key_size_check {
        return Ok(content);
    }

    let (key_type, length) = inspector
        .key_type_and_length(&content)
        .map_err(|e| e.context(inspector.name()))?;
    trace!(
        "Key info [native: {}]: {}-{}",
        config.start_builtin_server,
        key_type,
        length
    );

    match config.minimum_key_sizes.get(&key_type) {
        Some(&min) if min >= 0 && i64::from(length) >= i64::from(min) => Ok(content),
        Some(&min) if min >= 0 => Err(KeyError::KeyTooShort {
            got: length,
            needs: min,
        }),
        _ => {
            debug!("Rejected SSH key of type {}", key_type);
            Err(KeyError::KeyTypeNotAllowed(key_type))
        }
    }
}
