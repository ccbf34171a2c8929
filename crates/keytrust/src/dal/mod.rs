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

//! Data access layer for key records.
//!
//! This module provides:
//! - [`KeyQueries`]: typed find/insert/update/delete over GPG, SSH and deploy keys
//! - [`KeyStore`]: runs queries on a connection, optionally inside a transaction
//! - [`KeyStoreExt`]: value-returning `read`/`write` helpers over any store
//! - [`SqliteKeyStore`]: the SQLite implementation
//!
//! Unique-constraint violations surface as [`KeyError::UniqueViolation`].

mod deploy_key;
mod gpg_key;
mod public_key;
mod sqlite;

use crate::error::KeyError;
use crate::models::{
    AccessMode, DeployKey, GpgKey, GpgKeyImport, KeyType, PublicKey,
};
use chrono::{DateTime, Utc};

pub use sqlite::SqliteKeyStore;

/// Filter for GPG key lookups.
#[derive(Debug, Clone, Default)]
pub struct FindGpgKeyOptions {
    pub owner_id: Option<i64>,
    pub key_id: Option<String>,
    /// Also return subkeys. Otherwise only primaries match.
    pub include_sub_keys: bool,
}

/// Filter for SSH public key lookups.
#[derive(Debug, Clone, Default)]
pub struct FindPublicKeyOptions {
    pub owner_id: Option<i64>,
    pub fingerprint: Option<String>,
    pub key_types: Vec<KeyType>,
    pub not_key_type: Option<KeyType>,
    pub login_source_id: Option<i64>,
}

/// Filter for deploy key lookups.
#[derive(Debug, Clone, Default)]
pub struct FindDeployKeyOptions {
    pub repo_id: Option<i64>,
    pub key_id: Option<i64>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPublicKey {
    pub owner_id: i64,
    pub name: String,
    pub fingerprint: String,
    pub content: String,
    pub mode: AccessMode,
    pub key_type: KeyType,
    pub login_source_id: i64,
    pub verified: bool,
}

#[derive(Debug, Clone)]
pub struct NewDeployKey {
    pub key_id: i64,
    pub repo_id: i64,
    pub name: String,
    pub fingerprint: String,
    pub mode: AccessMode,
}

pub trait GpgKeyQueries {
    fn find_gpg_keys(&mut self, opts: &FindGpgKeyOptions) -> Result<Vec<GpgKey>, KeyError>;

    fn gpg_key_by_owner_and_id(
        &mut self,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<GpgKey>, KeyError>;

    fn count_primary_gpg_keys(&mut self, key_id: &str) -> Result<i64, KeyError>;

    /// Subkeys of all the given primaries in one query.
    fn gpg_sub_keys_for(&mut self, primary_key_ids: &[String]) -> Result<Vec<GpgKey>, KeyError>;

    /// Insert a key row, ignoring `key.id` and `key.sub_keys`. Returns the new id.
    fn insert_gpg_key(&mut self, key: &GpgKey) -> Result<i64, KeyError>;

    fn insert_gpg_import(&mut self, import: &GpgKeyImport) -> Result<(), KeyError>;

    fn gpg_import(&mut self, key_id: &str) -> Result<Option<GpgKeyImport>, KeyError>;

    fn set_gpg_key_verified(&mut self, id: i64) -> Result<usize, KeyError>;

    /// Delete the import record, the key and every subkey of `key_id`.
    fn delete_gpg_key_by_key_id(&mut self, key_id: &str) -> Result<usize, KeyError>;
}

pub trait PublicKeyQueries {
    fn public_key_by_id(&mut self, id: i64) -> Result<Option<PublicKey>, KeyError>;

    fn public_key_by_fingerprint(&mut self, fingerprint: &str)
        -> Result<Option<PublicKey>, KeyError>;

    fn public_key_by_content(&mut self, content: &str) -> Result<Option<PublicKey>, KeyError>;

    fn public_keys_by_content_prefix(&mut self, prefix: &str)
        -> Result<Vec<PublicKey>, KeyError>;

    fn find_public_keys(&mut self, opts: &FindPublicKeyOptions)
        -> Result<Vec<PublicKey>, KeyError>;

    fn count_public_keys_by_owner_and_name(
        &mut self,
        owner_id: i64,
        name: &str,
    ) -> Result<i64, KeyError>;

    fn count_principals(&mut self, content: &str) -> Result<i64, KeyError>;

    fn insert_public_key(&mut self, key: &NewPublicKey) -> Result<PublicKey, KeyError>;

    fn touch_public_key(&mut self, id: i64, at: DateTime<Utc>) -> Result<usize, KeyError>;

    fn set_public_key_verified(&mut self, id: i64) -> Result<usize, KeyError>;

    fn delete_public_keys(&mut self, ids: &[i64]) -> Result<usize, KeyError>;

    /// Every principal key, or every non-principal key, ordered by id.
    fn authorized_public_keys(&mut self, principals: bool) -> Result<Vec<PublicKey>, KeyError>;
}

pub trait DeployKeyQueries {
    fn deploy_key_by_id(&mut self, id: i64) -> Result<Option<DeployKey>, KeyError>;

    fn deploy_key_by_key_and_repo(
        &mut self,
        key_id: i64,
        repo_id: i64,
    ) -> Result<Option<DeployKey>, KeyError>;

    fn find_deploy_keys(&mut self, opts: &FindDeployKeyOptions)
        -> Result<Vec<DeployKey>, KeyError>;

    fn count_deploy_keys_by_repo_and_name(
        &mut self,
        repo_id: i64,
        name: &str,
    ) -> Result<i64, KeyError>;

    fn count_deploy_keys_by_key_id(&mut self, key_id: i64) -> Result<i64, KeyError>;

    fn insert_deploy_key(&mut self, key: &NewDeployKey) -> Result<DeployKey, KeyError>;

    fn delete_deploy_key(&mut self, id: i64) -> Result<usize, KeyError>;
}

/// All key queries available on one connection.
pub trait KeyQueries: GpgKeyQueries + PublicKeyQueries + DeployKeyQueries {}

impl<T: GpgKeyQueries + PublicKeyQueries + DeployKeyQueries + ?Sized> KeyQueries for T {}

/// Callback run against a connection.
pub type QueryFn<'f> = dyn FnMut(&mut dyn KeyQueries) -> Result<(), KeyError> + 'f;

/// The store collaborator.
pub trait KeyStore: Send + Sync {
    /// Run `f` inside one transaction. Any error rolls back everything `f` did.
    fn transaction(&self, f: &mut QueryFn<'_>) -> Result<(), KeyError>;

    /// Run `f` on a connection without a transaction.
    fn connection(&self, f: &mut QueryFn<'_>) -> Result<(), KeyError>;
}

/// Value-returning helpers for any [`KeyStore`].
pub trait KeyStoreExt: KeyStore {
    fn read<T, F>(&self, f: F) -> Result<T, KeyError>
    where
        F: FnOnce(&mut dyn KeyQueries) -> Result<T, KeyError>,
    {
        let mut f = Some(f);
        let mut out = None;
        self.connection(&mut |q: &mut dyn KeyQueries| {
            if let Some(f) = f.take() {
                out = Some(f(q)?);
            }
            Ok(())
        })?;
        out.ok_or_else(|| KeyError::Database("store did not run the query".to_string()))
    }

    fn write<T, F>(&self, f: F) -> Result<T, KeyError>
    where
        F: FnOnce(&mut dyn KeyQueries) -> Result<T, KeyError>,
    {
        let mut f = Some(f);
        let mut out = None;
        self.transaction(&mut |q: &mut dyn KeyQueries| {
            if let Some(f) = f.take() {
                out = Some(f(q)?);
            }
            Ok(())
        })?;
        out.ok_or_else(|| KeyError::Database("store did not run the transaction".to_string()))
    }
}

impl<S: KeyStore + ?Sized> KeyStoreExt for S {}

/// Fill `sub_keys` of every key in `keys` with one batched query.
pub fn load_sub_keys(q: &mut dyn KeyQueries, keys: &mut [GpgKey]) -> Result<(), KeyError> {
    let ids: Vec<String> = keys.iter().map(|k| k.key_id.clone()).collect();
    let mut subs = q.gpg_sub_keys_for(&ids)?;
    for key in keys.iter_mut() {
        let (mine, rest): (Vec<GpgKey>, Vec<GpgKey>) = subs
            .into_iter()
            .partition(|s| s.primary_key_id == key.key_id);
        key.sub_keys = mine;
        subs = rest;
    }
    Ok(())
}
