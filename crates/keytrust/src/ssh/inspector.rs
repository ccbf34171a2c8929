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

//! Key inspection: algorithm, bit length and fingerprint of a canonical
//! OpenSSH line.
//!
//! Two implementations exist:
//! - [`NativeInspector`] decodes the key in-process
//! - [`SshKeygenInspector`] shells out to `ssh-keygen -lf`
//!
//! [`inspector_for`] picks one at startup; callers hold it as
//! `Arc<dyn KeyInspector>` and never branch on the mode again.

use super::algorithm::{decode_blob, key_info};
use crate::config::SshConfig;
use crate::error::KeyError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ssh_key::HashAlg;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, error};

/// Inspects canonical single-line OpenSSH public keys.
pub trait KeyInspector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower-case algorithm family (`rsa`, `ecdsa`, `ed25519-sk`, ...) and
    /// key length in bits.
    fn key_type_and_length(&self, content: &str) -> Result<(String, u32), KeyError>;

    /// `SHA256:<base64-no-padding>`.
    fn fingerprint(&self, content: &str) -> Result<String, KeyError>;
}

/// Choose the inspector for this installation.
///
/// The embedded server, or an empty `keygen_path`, selects the native
/// decoder; otherwise `ssh-keygen` is used.
pub fn inspector_for(config: &SshConfig) -> Arc<dyn KeyInspector> {
    if config.start_builtin_server || config.keygen_path.is_empty() {
        Arc::new(NativeInspector)
    } else {
        Arc::new(SshKeygenInspector::new(
            config.keygen_path.clone(),
            config.key_test_path.clone(),
        ))
    }
}

fn key_blob(content: &str) -> Result<Vec<u8>, KeyError> {
    let mut fields = content.split_whitespace();
    let data = match (fields.next(), fields.next()) {
        (Some(_), Some(data)) => data,
        _ => {
            return Err(KeyError::InvalidKey(format!(
                "not enough fields in public key line: {}",
                content
            )))
        }
    };
    STANDARD
        .decode(data)
        .map_err(|e| KeyError::InvalidKey(format!("invalid key format: {}", e)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeInspector;

impl KeyInspector for NativeInspector {
    fn name(&self) -> &'static str {
        "native"
    }

    fn key_type_and_length(&self, content: &str) -> Result<(String, u32), KeyError> {
        let key = decode_blob(&key_blob(content)?)?;
        let info = key_info(key.key_data())?;
        Ok((info.family.to_string(), info.bits))
    }

    fn fingerprint(&self, content: &str) -> Result<String, KeyError> {
        let key = ssh_key::PublicKey::from_openssh(content.trim()).map_err(|e| {
            debug!("Unable to parse key for fingerprinting: {}", e);
            KeyError::InvalidKey("Unable to verify key content".to_string())
        })?;
        Ok(key.fingerprint(HashAlg::Sha256).to_string())
    }
}

/// Runs `ssh-keygen -lf` against a temporary copy of the key.
#[derive(Debug, Clone)]
pub struct SshKeygenInspector {
    keygen_path: String,
    temp_dir: PathBuf,
}

impl SshKeygenInspector {
    pub fn new(keygen_path: impl Into<String>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            keygen_path: keygen_path.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Write the key to a temp file and return `ssh-keygen -lf` stdout.
    fn run(&self, content: &str) -> Result<String, KeyError> {
        let mut file = tempfile::Builder::new()
            .prefix("keytest")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| KeyError::Io(e).context("creating key test file"))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        let output = Command::new(&self.keygen_path)
            .arg("-lf")
            .arg(file.path())
            .output()
            .map_err(|e| {
                KeyError::Subprocess(format!("failed to run {}: {}", self.keygen_path, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if stdout.contains("is not a public key file") || stderr.contains("is not a public key file")
        {
            debug!("ssh-keygen could not read key: {}", stderr.trim());
            return Err(KeyError::InvalidKey(
                "Unable to verify key content".to_string(),
            ));
        }
        if !output.status.success() {
            error!("ssh-keygen failed: {}", stderr.trim());
            return Err(KeyError::Subprocess(format!(
                "fail to parse public key: {} - {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

impl KeyInspector for SshKeygenInspector {
    fn name(&self) -> &'static str {
        "ssh-keygen"
    }

    /// Parses `<bits> <fingerprint> <comment> (<TYPE>)`.
    fn key_type_and_length(&self, content: &str) -> Result<(String, u32), KeyError> {
        let stdout = self.run(content)?;
        let fields: Vec<&str> = stdout.split(' ').collect();
        if fields.len() < 4 {
            return Err(KeyError::InvalidKey(format!(
                "invalid public key line: {}",
                stdout
            )));
        }
        let key_type = fields[fields.len() - 1]
            .trim_matches(|c| matches!(c, '(' | ')' | '\r' | '\n'))
            .to_lowercase();
        let length = fields[0].parse::<u32>().map_err(|e| {
            KeyError::InvalidKey(format!("invalid key length {:?}: {}", fields[0], e))
        })?;
        Ok((key_type, length))
    }

    fn fingerprint(&self, content: &str) -> Result<String, KeyError> {
        let stdout = self.run(content)?;
        match stdout.split(' ').nth(1) {
            Some(fp) if stdout.len() >= 2 => Ok(fp.to_string()),
            _ => Err(KeyError::InvalidKey(format!(
                "not enough output for calculating fingerprint: {}",
                stdout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vector {
        family: &'static str,
        bits: u32,
        fingerprint: &'static str,
        content: &'static str,
    }

    const VECTORS: &[Vector] = &[
        Vector {
            family: "rsa",
            bits: 1024,
            fingerprint: "SHA256:vSnDkvRh/xM6kMxPidLgrUhq3mCN7CDaronCEm2joyQ",
            content: "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAAAgQDAu7tvIvX6ZHrRXuZNfkR3XLHSsuCK9Zn3X58lxBcQzuo5xZgB6vRwwm/QtJuF+zZPtY5hsQILBLmF+BZ5WpKZp1jBeSjH2G7lxet9kbcH+kIVj0tPFEoyKI9wvWqIwC4prx/WVk2wLTJjzBAhyNxfEq7C9CeiX9pQEbEqJfkKCQ== nocomment\n",
        },
        Vector {
            family: "rsa",
            bits: 2048,
            fingerprint: "SHA256:ZHD//a1b9VuTq9XSunAeYjKeU1xDa2tBFZYrFr2Okkg",
            content: "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQDMZXh+1OBUwSH9D45wTaxErQIN9IoC9xl7MKJkqvTvv6O5RR9YW/IK9FbfjXgXsppYGhsCZo1hFOOsXHMnfOORqu/xMDx4yPuyvKpw4LePEcg4TDipaDFuxbWOqc/BUZRZcXu41QAWfDLrInwsltWZHSeG7hjhpacl4FrVv9V1pS6Oc5Q1NxxEzTzuNLS/8diZrTm/YAQQ/+B+mzWI3zEtF4miZjjAljWd1LTBPvU23d29DcBmmFahcZ441XZsTeAwGxG/Q6j8NgNXj9WxMeWwxXV2jeAX/EBSpZrCVlCQ1yJswT6xCp8TuBnTiGWYMBNTbOZvPC4e0WI2/yZW/s5F nocomment",
        },
        Vector {
            family: "ecdsa",
            bits: 256,
            fingerprint: "SHA256:Bqx/xgWqRKLtkZ0Lr4iZpgb+5lYsFpSwXwVZbPwuTRw",
            content: "ecdsa-sha2-nistp256 AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBFQacN3PrOll7PXmN5B/ZNVahiUIqI05nbBlZk1KXsO3d06ktAWqbNflv2vEmA38bTFTfJ2sbn2B5ksT52cDDbA= nocomment",
        },
        Vector {
            family: "ecdsa",
            bits: 384,
            fingerprint: "SHA256:4qfJOgJDtUd8BrEjyVNdI8IgjiZKouztVde43aDhe1E",
            content: "ecdsa-sha2-nistp384 AAAAE2VjZHNhLXNoYTItbmlzdHAzODQAAAAIbmlzdHAzODQAAABhBINmioV+XRX1Fm9Qk2ehHXJ2tfVxW30ypUWZw670Zyq5GQfBAH6xjygRsJ5wWsHXBsGYgFUXIHvMKVAG1tpw7s6ax9oA+dJOJ7tj+vhn8joFqT+sg3LYHgZkHrfqryRasQ== nocomment",
        },
        Vector {
            family: "ecdsa-sk",
            bits: 256,
            fingerprint: "SHA256:4wcIu4z+53gHc+db85OPfy8IydyNzPLCr6kHIs625LQ",
            content: "sk-ecdsa-sha2-nistp256@openssh.com AAAAInNrLWVjZHNhLXNoYTItbmlzdHAyNTZAb3BlbnNzaC5jb20AAAAIbmlzdHAyNTYAAABBBGXEEzWmm1dxb+57RoK5KVCL0w2eNv9cqJX2AGGVlkFsVDhOXHzsadS3LTK4VlEbbrDMJdoti9yM8vclA8IeRacAAAAEc3NoOg== nocomment",
        },
        Vector {
            family: "ed25519-sk",
            bits: 256,
            fingerprint: "SHA256:RB4ku1OeWKN7fLMrjxz38DK0mp1BnOPBx4BItjTvJ0g",
            content: "sk-ssh-ed25519@openssh.com AAAAGnNrLXNzaC1lZDI1NTE5QG9wZW5zc2guY29tAAAAIE7kM1R02+4ertDKGKEDcKG0s+2vyDDcIvceJ0Gqv5f1AAAABHNzaDo= nocomment",
        },
    ];

    #[test]
    fn test_native_key_type_and_length() {
        for v in VECTORS {
            let (family, bits) = NativeInspector.key_type_and_length(v.content).unwrap();
            assert_eq!(family, v.family);
            assert_eq!(bits, v.bits);
        }
    }

    #[test]
    fn test_native_fingerprint() {
        for v in VECTORS {
            assert_eq!(NativeInspector.fingerprint(v.content).unwrap(), v.fingerprint);
        }
    }

    #[test]
    fn test_not_enough_fields() {
        assert!(NativeInspector.key_type_and_length("ssh-rsa").is_err());
    }

    #[test]
    fn test_inspector_selection() {
        let mut config = SshConfig::default();
        config.start_builtin_server = true;
        assert_eq!(inspector_for(&config).name(), "native");

        config.start_builtin_server = false;
        config.keygen_path = "ssh-keygen".to_string();
        assert_eq!(inspector_for(&config).name(), "ssh-keygen");

        config.keygen_path.clear();
        assert_eq!(inspector_for(&config).name(), "native");
    }
}
