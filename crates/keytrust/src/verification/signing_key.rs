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

//! The installation-wide signing key.

use crate::config::SigningConfig;
use crate::error::{KeyError, ResultExt};
use std::process::Command;

/// Whether `signing_key` names a concrete key rather than `default` or `none`.
pub fn uses_explicit_key(config: &SigningConfig) -> bool {
    !matches!(config.signing_key.as_str(), "" | "default" | "none")
}

/// Read the armored public key of the installation signing key.
///
/// Reads `public_key_path` when configured, otherwise exports the key from
/// the local keyring with `gpg --armor --export`.
pub fn load_installation_key(config: &SigningConfig) -> Result<String, KeyError> {
    if let Some(path) = &config.public_key_path {
        return std::fs::read_to_string(path)
            .map_err(KeyError::from)
            .with_context(|| format!("reading signing key {}", path.display()));
    }

    let output = Command::new(&config.gpg_program)
        .args(["--armor", "--export", config.signing_key.as_str()])
        .output()
        .map_err(KeyError::from)
        .with_context(|| format!("running {}", config.gpg_program))?;

    if !output.status.success() {
        return Err(KeyError::Subprocess(format!(
            "{} --export {}: {} {}",
            config.gpg_program,
            config.signing_key,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let content = String::from_utf8_lossy(&output.stdout).into_owned();
    if content.trim().is_empty() {
        return Err(KeyError::Subprocess(format!(
            "{} exported nothing for {}",
            config.gpg_program, config.signing_key
        )));
    }
    Ok(content)
}
