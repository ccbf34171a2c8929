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

//! Authorized-keys file management.
//!
//! This module provides:
//! - Shell escaping and forced-command stanza rendering
//! - Full rewrites of `authorized_keys` and `authorized_principals` that
//!   preserve entries not written by this crate
//! - Appending stanzas for newly added keys

mod file;
mod stanza;

pub use file::AuthorizedKeysWriter;
pub use stanza::{authorized_string, render_command, shell_escape, MARKER};
