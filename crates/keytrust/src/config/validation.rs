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

use crate::config::{types::*, ValidationError};

pub const PRINCIPAL_RULES: [&str; 4] = ["anything", "email", "username", "off"];

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for KeyTrustConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = self.ssh.validate() {
            errors.push(e);
        }
        if let Err(e) = self.service.validate() {
            errors.push(e);
        }
        if let Err(e) = self.database.validate() {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple { errors }),
        }
    }
}

impl Validate for SshConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.authorized_keys_command_template.trim().is_empty() {
            return Err(ValidationError::EmptyCommandTemplate);
        }

        for rule in &self.authorized_principals_allow {
            if !PRINCIPAL_RULES.contains(&rule.as_str()) {
                return Err(ValidationError::InvalidPrincipalRule { rule: rule.clone() });
            }
        }

        for (algorithm, size) in &self.minimum_key_sizes {
            if *size < -1 {
                return Err(ValidationError::InvalidMinimumKeySize {
                    algorithm: algorithm.clone(),
                    size: *size,
                });
            }
        }

        Ok(())
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.verification_token_minutes < 0 {
            return Err(ValidationError::InvalidTokenLifetime {
                minutes: self.verification_token_minutes,
            });
        }
        Ok(())
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.pool_size == 0 || self.pool_size > 100 {
            return Err(ValidationError::InvalidPoolSize {
                size: self.pool_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(KeyTrustConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_principal_rule_rejected() {
        let mut config = KeyTrustConfig::default();
        config.ssh.authorized_principals_allow = vec!["everyone".to_string()];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrincipalRule { .. }));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = KeyTrustConfig::default();
        config.ssh.authorized_keys_command_template = "  ".to_string();
        config.database.pool_size = 0;
        let err = config.validate().unwrap_err();
        match err {
            ValidationError::Multiple { errors } => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }
}
