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

//! Domain records for keys, accounts and verification results.

mod account;
mod deploy_key;
mod gpg_key;
mod public_key;
mod verification;

pub use account::{EmailAddress, User};
pub use deploy_key::DeployKey;
pub use gpg_key::{GpgKey, GpgKeyImport};
pub use public_key::{AccessMode, KeyType, PublicKey};
pub use verification::{CommitVerification, Reason, TrustModel, TrustStatus};
