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
use super::{FindGpgKeyOptions, GpgKeyQueries};
use crate::database::schema::{gpg_key, gpg_key_import};
use crate::error::KeyError;
use crate::models::{EmailAddress, GpgKey, GpgKeyImport};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = gpg_key)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct GpgKeyRow {
    id: i64,
    owner_id: i64,
    key_id: String,
    primary_key_id: String,
    content: String,
    created_at: NaiveDateTime,
    expired_at: Option<NaiveDateTime>,
    added_at: NaiveDateTime,
    emails: String,
    verified: bool,
    can_sign: bool,
    can_encrypt_comms: bool,
    can_encrypt_storage: bool,
    can_certify: bool,
}

#[derive(Insertable)]
#[diesel(table_name = gpg_key)]
struct NewGpgKeyRow<'a> {
    owner_id: i64,
    key_id: &'a str,
    primary_key_id: &'a str,
    content: &'a str,
    created_at: NaiveDateTime,
    expired_at: Option<NaiveDateTime>,
    added_at: NaiveDateTime,
    emails: String,
    verified: bool,
    can_sign: bool,
    can_encrypt_comms: bool,
    can_encrypt_storage: bool,
    can_certify: bool,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = gpg_key_import)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct GpgKeyImportRow {
    key_id: String,
    content: String,
}

impl TryFrom<GpgKeyRow> for GpgKey {
    type Error = KeyError;

    fn try_from(row: GpgKeyRow) -> Result<Self, Self::Error> {
        let emails: Vec<EmailAddress> = serde_json::from_str(&row.emails).map_err(|e| {
            KeyError::Database(format!("corrupt emails for GPG key {}: {}", row.key_id, e))
        })?;
        Ok(GpgKey {
            id: row.id,
            owner_id: row.owner_id,
            key_id: row.key_id,
            primary_key_id: row.primary_key_id,
            content: row.content,
            created_at: from_naive(row.created_at),
            expired_at: row.expired_at.map(from_naive),
            added_at: from_naive(row.added_at),
            emails,
            verified: row.verified,
            can_sign: row.can_sign,
            can_encrypt_comms: row.can_encrypt_comms,
            can_encrypt_storage: row.can_encrypt_storage,
            can_certify: row.can_certify,
            sub_keys: Vec::new(),
        })
    }
}

fn into_keys(rows: Vec<GpgKeyRow>) -> Result<Vec<GpgKey>, KeyError> {
    rows.into_iter().map(GpgKey::try_from).collect()
}

impl GpgKeyQueries for SqliteConnection {
    fn find_gpg_keys(&mut self, opts: &FindGpgKeyOptions) -> Result<Vec<GpgKey>, KeyError> {
        let mut query = gpg_key::table
            .select(GpgKeyRow::as_select())
            .order(gpg_key::id.asc())
            .into_boxed();
        if let Some(owner) = opts.owner_id {
            query = query.filter(gpg_key::owner_id.eq(owner));
        }
        if let Some(key_id) = &opts.key_id {
            query = query.filter(gpg_key::key_id.eq(key_id.clone()));
        }
        if !opts.include_sub_keys {
            query = query.filter(gpg_key::primary_key_id.eq(""));
        }

        let rows = query.load(self)?;
        tracing::debug!("Found {} GPG keys for {:?}", rows.len(), opts);
        into_keys(rows)
    }

    fn gpg_key_by_owner_and_id(
        &mut self,
        owner: i64,
        key_row_id: i64,
    ) -> Result<Option<GpgKey>, KeyError> {
        gpg_key::table
            .filter(gpg_key::id.eq(key_row_id))
            .filter(gpg_key::owner_id.eq(owner))
            .select(GpgKeyRow::as_select())
            .first(self)
            .optional()?
            .map(GpgKey::try_from)
            .transpose()
    }

    fn count_primary_gpg_keys(&mut self, id: &str) -> Result<i64, KeyError> {
        Ok(gpg_key::table
            .filter(gpg_key::key_id.eq(id))
            .filter(gpg_key::primary_key_id.eq(""))
            .count()
            .get_result(self)?)
    }

    fn gpg_sub_keys_for(&mut self, primary_key_ids: &[String]) -> Result<Vec<GpgKey>, KeyError> {
        if primary_key_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = gpg_key::table
            .filter(gpg_key::primary_key_id.eq_any(primary_key_ids))
            .select(GpgKeyRow::as_select())
            .order(gpg_key::id.asc())
            .load(self)?;
        into_keys(rows)
    }

    fn insert_gpg_key(&mut self, key: &GpgKey) -> Result<i64, KeyError> {
        let emails = serde_json::to_string(&key.emails)
            .map_err(|e| KeyError::Database(format!("serializing emails: {}", e)))?;
        let row = NewGpgKeyRow {
            owner_id: key.owner_id,
            key_id: &key.key_id,
            primary_key_id: &key.primary_key_id,
            content: &key.content,
            created_at: to_naive(key.created_at),
            expired_at: key.expired_at.map(to_naive),
            added_at: to_naive(key.added_at),
            emails,
            verified: key.verified,
            can_sign: key.can_sign,
            can_encrypt_comms: key.can_encrypt_comms,
            can_encrypt_storage: key.can_encrypt_storage,
            can_certify: key.can_certify,
        };

        let id = diesel::insert_into(gpg_key::table)
            .values(&row)
            .returning(gpg_key::id)
            .get_result::<i64>(self)?;
        tracing::debug!("Inserted GPG key {} as row {}", key.key_id, id);
        Ok(id)
    }

    fn insert_gpg_import(&mut self, import: &GpgKeyImport) -> Result<(), KeyError> {
        diesel::insert_into(gpg_key_import::table)
            .values(&GpgKeyImportRow {
                key_id: import.key_id.clone(),
                content: import.content.clone(),
            })
            .execute(self)?;
        Ok(())
    }

    fn gpg_import(&mut self, id: &str) -> Result<Option<GpgKeyImport>, KeyError> {
        let row = gpg_key_import::table
            .filter(gpg_key_import::key_id.eq(id))
            .select(GpgKeyImportRow::as_select())
            .first(self)
            .optional()?;
        Ok(row.map(|row| GpgKeyImport {
            key_id: row.key_id,
            content: row.content,
        }))
    }

    fn set_gpg_key_verified(&mut self, key_row_id: i64) -> Result<usize, KeyError> {
        Ok(diesel::update(gpg_key::table.filter(gpg_key::id.eq(key_row_id)))
            .set(gpg_key::verified.eq(true))
            .execute(self)?)
    }

    fn delete_gpg_key_by_key_id(&mut self, id: &str) -> Result<usize, KeyError> {
        let imports =
            diesel::delete(gpg_key_import::table.filter(gpg_key_import::key_id.eq(id)))
                .execute(self)?;
        let keys = diesel::delete(
            gpg_key::table.filter(gpg_key::key_id.eq(id).or(gpg_key::primary_key_id.eq(id))),
        )
        .execute(self)?;
        tracing::debug!(
            "Deleted GPG key {}: {} import records, {} keys",
            id,
            imports,
            keys
        );
        Ok(keys)
    }
}
