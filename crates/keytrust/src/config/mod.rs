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

//! Configuration for key management and verification.
//!
//! Settings are read from TOML with `${VAR}` style environment substitution.
//! Every section has defaults, so a file only needs the values it changes.

mod defaults;
mod error;
mod loader;
mod types;
mod validation;

pub use defaults::{default_minimum_key_sizes, DEFAULT_KEY_COMMAND_TEMPLATE};
pub use error::{ConfigError, ValidationError};
pub use loader::{ConfigLoader, CONFIG_ENV_VAR};
pub use types::{
    AppConfig, DatabaseConfig, KeyTrustConfig, ServiceConfig, SigningConfig, SshConfig,
};
pub use validation::Validate;
