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

use super::sqlite::{from_naive, to_naive};
use super::{FindPublicKeyOptions, NewPublicKey, PublicKeyQueries};
use crate::database::schema::public_key;
use crate::error::KeyError;
use crate::models::{AccessMode, KeyType, PublicKey};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = public_key)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct PublicKeyRow {
    id: i64,
    owner_id: i64,
    name: String,
    fingerprint: String,
    content: String,
    mode: i32,
    key_type: i32,
    login_source_id: i64,
    verified: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = public_key)]
struct NewPublicKeyRow<'a> {
    owner_id: i64,
    name: &'a str,
    fingerprint: &'a str,
    content: &'a str,
    mode: i32,
    key_type: i32,
    login_source_id: i64,
    verified: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<PublicKeyRow> for PublicKey {
    type Error = KeyError;

    fn try_from(row: PublicKeyRow) -> Result<Self, Self::Error> {
        let key_type = KeyType::from_i32(row.key_type).ok_or_else(|| {
            KeyError::Database(format!(
                "public key {} has unknown type {}",
                row.id, row.key_type
            ))
        })?;
        Ok(PublicKey {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            fingerprint: row.fingerprint,
            content: row.content,
            mode: AccessMode::from_i32(row.mode),
            key_type,
            login_source_id: row.login_source_id,
            verified: row.verified,
            created_at: from_naive(row.created_at),
            updated_at: from_naive(row.updated_at),
        })
    }
}

fn into_keys(rows: Vec<PublicKeyRow>) -> Result<Vec<PublicKey>, KeyError> {
    rows.into_iter().map(PublicKey::try_from).collect()
}

fn into_key(row: Option<PublicKeyRow>) -> Result<Option<PublicKey>, KeyError> {
    row.map(PublicKey::try_from).transpose()
}

impl PublicKeyQueries for SqliteConnection {
    fn public_key_by_id(&mut self, key_row_id: i64) -> Result<Option<PublicKey>, KeyError> {
        let row = public_key::table
            .filter(public_key::id.eq(key_row_id))
            .select(PublicKeyRow::as_select())
            .first(self)
            .optional()?;
        into_key(row)
    }

    fn public_key_by_fingerprint(&mut self, fp: &str) -> Result<Option<PublicKey>, KeyError> {
        let row = public_key::table
            .filter(public_key::fingerprint.eq(fp))
            .select(PublicKeyRow::as_select())
            .first(self)
            .optional()?;
        into_key(row)
    }

    fn public_key_by_content(&mut self, text: &str) -> Result<Option<PublicKey>, KeyError> {
        let row = public_key::table
            .filter(public_key::content.eq(text))
            .select(PublicKeyRow::as_select())
            .first(self)
            .optional()?;
        into_key(row)
    }

    fn public_keys_by_content_prefix(&mut self, prefix: &str) -> Result<Vec<PublicKey>, KeyError> {
        let rows = public_key::table
            .filter(public_key::content.like(format!("{}%", prefix)))
            .select(PublicKeyRow::as_select())
            .order(public_key::id.asc())
            .load(self)?;
        into_keys(rows)
    }

    fn find_public_keys(&mut self, opts: &FindPublicKeyOptions) -> Result<Vec<PublicKey>, KeyError> {
        let mut query = public_key::table
            .select(PublicKeyRow::as_select())
            .order(public_key::id.asc())
            .into_boxed();
        if let Some(owner) = opts.owner_id {
            query = query.filter(public_key::owner_id.eq(owner));
        }
        if let Some(fp) = &opts.fingerprint {
            query = query.filter(public_key::fingerprint.eq(fp.clone()));
        }
        if !opts.key_types.is_empty() {
            let types: Vec<i32> = opts.key_types.iter().map(|t| t.as_i32()).collect();
            query = query.filter(public_key::key_type.eq_any(types));
        }
        if let Some(excluded) = opts.not_key_type {
            query = query.filter(public_key::key_type.ne(excluded.as_i32()));
        }
        if let Some(source) = opts.login_source_id {
            query = query.filter(public_key::login_source_id.eq(source));
        }

        into_keys(query.load(self)?)
    }

    fn count_public_keys_by_owner_and_name(
        &mut self,
        owner: i64,
        key_name: &str,
    ) -> Result<i64, KeyError> {
        Ok(public_key::table
            .filter(public_key::owner_id.eq(owner))
            .filter(public_key::name.eq(key_name))
            .count()
            .get_result(self)?)
    }

    fn count_principals(&mut self, text: &str) -> Result<i64, KeyError> {
        Ok(public_key::table
            .filter(public_key::content.eq(text))
            .filter(public_key::key_type.eq(KeyType::Principal.as_i32()))
            .count()
            .get_result(self)?)
    }

    fn insert_public_key(&mut self, key: &NewPublicKey) -> Result<PublicKey, KeyError> {
        let now = to_naive(Utc::now());
        let row = NewPublicKeyRow {
            owner_id: key.owner_id,
            name: &key.name,
            fingerprint: &key.fingerprint,
            content: &key.content,
            mode: key.mode.as_i32(),
            key_type: key.key_type.as_i32(),
            login_source_id: key.login_source_id,
            verified: key.verified,
            created_at: now,
            updated_at: now,
        };

        let inserted = diesel::insert_into(public_key::table)
            .values(&row)
            .returning(PublicKeyRow::as_returning())
            .get_result(self)?;
        tracing::debug!(
            "Inserted {} key '{}' for owner {}",
            key.key_type,
            key.name,
            key.owner_id
        );
        PublicKey::try_from(inserted)
    }

    fn touch_public_key(&mut self, key_row_id: i64, at: DateTime<Utc>) -> Result<usize, KeyError> {
        Ok(diesel::update(public_key::table.filter(public_key::id.eq(key_row_id)))
            .set(public_key::updated_at.eq(to_naive(at)))
            .execute(self)?)
    }

    fn set_public_key_verified(&mut self, key_row_id: i64) -> Result<usize, KeyError> {
        Ok(diesel::update(public_key::table.filter(public_key::id.eq(key_row_id)))
            .set(public_key::verified.eq(true))
            .execute(self)?)
    }

    fn delete_public_keys(&mut self, ids: &[i64]) -> Result<usize, KeyError> {
        if ids.is_empty() {
            return Ok(0);
        }
        Ok(diesel::delete(public_key::table.filter(public_key::id.eq_any(ids))).execute(self)?)
    }

    fn authorized_public_keys(&mut self, principals: bool) -> Result<Vec<PublicKey>, KeyError> {
        let principal = KeyType::Principal.as_i32();
        let query = public_key::table
            .select(PublicKeyRow::as_select())
            .order(public_key::id.asc())
            .into_boxed();
        let query = if principals {
            query.filter(public_key::key_type.eq(principal))
        } else {
            query.filter(public_key::key_type.ne(principal))
        };
        into_keys(query.load(self)?)
    }
}
