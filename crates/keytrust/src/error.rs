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

//! Error types for key management and verification.
//!
//! Every [`KeyError`] variant belongs to exactly one [`ErrorKind`]. Callers
//! branch on the kind (for example to map NotFound to a 404) while the
//! variant carries the identifiers needed for a useful message.

use thiserror::Error;

/// Coarse classification of a [`KeyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    PermissionDenied,
    InvalidArgument,
    Parsing,
    NoEmailFound,
    InvalidTokenSignature,
    Internal,
}

/// Errors that can occur during key management operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("GPG key does not exist [id: {id}]")]
    GpgKeyNotFound { id: String },

    #[error("GPG key import does not exist [key_id: {key_id}]")]
    GpgImportNotFound { key_id: String },

    #[error("public key does not exist [{0}]")]
    PublicKeyNotFound(String),

    #[error("deploy key does not exist [{0}]")]
    DeployKeyNotFound(String),

    #[error("GPG key already exists [key_id: {key_id}]")]
    GpgKeyIdAlreadyUsed { key_id: String },

    #[error("public key already exists [fingerprint: {fingerprint}]")]
    KeyAlreadyExists { fingerprint: String },

    #[error("public key already exists [owner_id: {owner_id}, name: {name}]")]
    KeyNameAlreadyUsed { owner_id: i64, name: String },

    #[error("deploy key already exists [key_id: {key_id}, repo_id: {repo_id}]")]
    DeployKeyAlreadyExists { key_id: i64, repo_id: i64 },

    #[error("deploy key name already used [repo_id: {repo_id}, name: {name}]")]
    DeployKeyNameAlreadyUsed { repo_id: i64, name: String },

    #[error("principal already exists [content: {content}]")]
    PrincipalAlreadyExists { content: String },

    #[error("user does not have access to the key [user_id: {user_id}, key_id: {key_id}, note: {note}]")]
    AccessDenied {
        user_id: i64,
        key_id: i64,
        note: String,
    },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("key length is not enough: got {got}, needs {needs}")]
    KeyTooShort { got: u32, needs: i32 },

    #[error("key type is not allowed: {0}")]
    KeyTypeNotAllowed(String),

    #[error("only a single line with a single key please")]
    MultipleLines,

    #[error("didn't match allowed principals: {0}")]
    PrincipalNotAllowed(String),

    #[error("SSH is disabled")]
    SshDisabled,

    #[error("failed to parse: {0}")]
    Parsing(String),

    #[error("no activated email matches the key identities: {emails:?}")]
    NoEmailFound { emails: Vec<String> },

    #[error("the provided signature does not sign the token [id: {id}]")]
    InvalidTokenSignature { id: String, reason: String },

    #[error("the provided signature does not sign the token [fingerprint: {fingerprint}]")]
    SshInvalidTokenSignature { fingerprint: String, reason: String },

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external command failed: {0}")]
    Subprocess(String),

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<KeyError>,
    },
}

impl KeyError {
    /// Classify the error. Context wrappers are looked through.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyError::GpgKeyNotFound { .. }
            | KeyError::GpgImportNotFound { .. }
            | KeyError::PublicKeyNotFound(_)
            | KeyError::DeployKeyNotFound(_) => ErrorKind::NotFound,
            KeyError::GpgKeyIdAlreadyUsed { .. }
            | KeyError::KeyAlreadyExists { .. }
            | KeyError::KeyNameAlreadyUsed { .. }
            | KeyError::DeployKeyAlreadyExists { .. }
            | KeyError::DeployKeyNameAlreadyUsed { .. }
            | KeyError::PrincipalAlreadyExists { .. }
            | KeyError::UniqueViolation(_) => ErrorKind::AlreadyExists,
            KeyError::AccessDenied { .. } => ErrorKind::PermissionDenied,
            KeyError::InvalidKey(_)
            | KeyError::KeyTooShort { .. }
            | KeyError::KeyTypeNotAllowed(_)
            | KeyError::MultipleLines
            | KeyError::PrincipalNotAllowed(_)
            | KeyError::SshDisabled => ErrorKind::InvalidArgument,
            KeyError::Parsing(_) => ErrorKind::Parsing,
            KeyError::NoEmailFound { .. } => ErrorKind::NoEmailFound,
            KeyError::InvalidTokenSignature { .. } | KeyError::SshInvalidTokenSignature { .. } => {
                ErrorKind::InvalidTokenSignature
            }
            KeyError::Database(_)
            | KeyError::Io(_)
            | KeyError::Subprocess(_)
            | KeyError::Collaborator(_) => ErrorKind::Internal,
            KeyError::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Wrap the error with operation or key-id context, preserving its kind.
    pub fn context(self, context: impl Into<String>) -> Self {
        KeyError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &KeyError {
        match self {
            KeyError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<diesel::result::Error> for KeyError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                KeyError::UniqueViolation(info.message().to_string())
            }
            other => KeyError::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for KeyError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        KeyError::Database(format!("connection pool: {}", err))
    }
}

/// Extension for attaching context to results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T, KeyError>;

    fn with_context<F, S>(self, f: F) -> Result<T, KeyError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, KeyError> {
    fn context(self, context: impl Into<String>) -> Result<T, KeyError> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T, KeyError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
