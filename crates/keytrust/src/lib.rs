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

//! # keytrust
//!
//! Key management and commit signature verification for a hosted
//! source-control service.
//!
//! ## Key Features
//!
//! - OpenPGP key import with identity-to-email matching and subkey records
//! - SSH key normalisation (OpenSSH, RFC 4716 and PEM) with minimum size checks
//! - Commit verification over GPG and SSH signatures through an ordered rule
//!   pipeline
//! - Trust classification of verified commits per repository trust model
//! - Challenge-token ownership proofs for GPG and SSH keys
//! - Regeneration of `authorized_keys` and `authorized_principals`
//!
//! ## Example
//!
//! ```rust,ignore
//! use keytrust::{ConfigLoader, Database, KeyService, SqliteKeyStore};
//! use std::sync::Arc;
//!
//! let config = Arc::new(ConfigLoader::new().load_config(None)?);
//! let store = Arc::new(SqliteKeyStore::new(Database::from_config(&config.database)?));
//! let service = KeyService::new(store, accounts, config);
//!
//! let key = service.add_public_key(user.id, "laptop", &content, 0)?;
//! let verification = service
//!     .commit_verifier()
//!     .verify_commit(&commit, &keytrust::verification::NoRepositoryKey);
//! ```

pub mod accounts;
pub mod audit;
pub mod authorized_keys;
pub mod config;
pub mod dal;
pub mod database;
pub mod error;
pub mod gpg;
pub mod logging;
pub mod models;
pub mod ownership;
pub mod service;
pub mod ssh;
pub mod trust;
pub mod verification;

pub use accounts::{AccountDirectory, InMemoryAccounts};
pub use authorized_keys::AuthorizedKeysWriter;
pub use config::{ConfigLoader, KeyTrustConfig};
pub use dal::{KeyStore, KeyStoreExt, SqliteKeyStore};
pub use database::Database;
pub use error::{ErrorKind, KeyError};
pub use logging::init_logging;
pub use models::{
    AccessMode, CommitVerification, DeployKey, EmailAddress, GpgKey, GpgKeyImport, KeyType,
    PublicKey, Reason, TrustModel, TrustStatus, User,
};
pub use service::KeyService;
pub use trust::calculate_trust_status;
pub use verification::{CommitVerifier, SignedCommit};
