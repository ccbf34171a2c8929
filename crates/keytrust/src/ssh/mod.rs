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

//! SSH public key handling.
//!
//! This module provides:
//! - Normalisation of OpenSSH lines, RFC 4716 blocks and PEM keys to one
//!   canonical authorized-keys line
//! - Minimum key size enforcement
//! - The [`KeyInspector`] capability for key length and fingerprint
//! - SSHSIG signature verification

pub mod algorithm;
mod inspector;
mod parse;
mod pkix;
mod signature;

pub use inspector::{inspector_for, KeyInspector, NativeInspector, SshKeygenInspector};
pub use parse::{check_public_key_string, parse_key_string};
pub use signature::{
    is_ssh_signature, verify_ssh_signature, GIT_NAMESPACE, OWNERSHIP_NAMESPACE,
};
