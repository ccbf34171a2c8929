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
use super::{DeployKeyQueries, FindDeployKeyOptions, NewDeployKey};
use crate::database::schema::deploy_key;
use crate::error::KeyError;
use crate::models::{AccessMode, DeployKey};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = deploy_key)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DeployKeyRow {
    id: i64,
    key_id: i64,
    repo_id: i64,
    name: String,
    fingerprint: String,
    mode: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = deploy_key)]
struct NewDeployKeyRow<'a> {
    key_id: i64,
    repo_id: i64,
    name: &'a str,
    fingerprint: &'a str,
    mode: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<DeployKeyRow> for DeployKey {
    fn from(row: DeployKeyRow) -> Self {
        DeployKey {
            id: row.id,
            key_id: row.key_id,
            repo_id: row.repo_id,
            name: row.name,
            fingerprint: row.fingerprint,
            mode: AccessMode::from_i32(row.mode),
            created_at: from_naive(row.created_at),
            updated_at: from_naive(row.updated_at),
        }
    }
}

impl DeployKeyQueries for SqliteConnection {
    fn deploy_key_by_id(&mut self, row_id: i64) -> Result<Option<DeployKey>, KeyError> {
        let row = deploy_key::table
            .filter(deploy_key::id.eq(row_id))
            .select(DeployKeyRow::as_select())
            .first(self)
            .optional()?;
        Ok(row.map(DeployKey::from))
    }

    fn deploy_key_by_key_and_repo(
        &mut self,
        public_key_id: i64,
        repo: i64,
    ) -> Result<Option<DeployKey>, KeyError> {
        let row = deploy_key::table
            .filter(deploy_key::key_id.eq(public_key_id))
            .filter(deploy_key::repo_id.eq(repo))
            .select(DeployKeyRow::as_select())
            .first(self)
            .optional()?;
        Ok(row.map(DeployKey::from))
    }

    fn find_deploy_keys(&mut self, opts: &FindDeployKeyOptions) -> Result<Vec<DeployKey>, KeyError> {
        let mut query = deploy_key::table
            .select(DeployKeyRow::as_select())
            .order(deploy_key::id.asc())
            .into_boxed();
        if let Some(repo) = opts.repo_id {
            query = query.filter(deploy_key::repo_id.eq(repo));
        }
        if let Some(public_key_id) = opts.key_id {
            query = query.filter(deploy_key::key_id.eq(public_key_id));
        }
        if let Some(fp) = &opts.fingerprint {
            query = query.filter(deploy_key::fingerprint.eq(fp.clone()));
        }
        let rows = query.load(self)?;
        Ok(rows.into_iter().map(DeployKey::from).collect())
    }

    fn count_deploy_keys_by_repo_and_name(
        &mut self,
        repo: i64,
        key_name: &str,
    ) -> Result<i64, KeyError> {
        Ok(deploy_key::table
            .filter(deploy_key::repo_id.eq(repo))
            .filter(deploy_key::name.eq(key_name))
            .count()
            .get_result(self)?)
    }

    fn count_deploy_keys_by_key_id(&mut self, public_key_id: i64) -> Result<i64, KeyError> {
        Ok(deploy_key::table
            .filter(deploy_key::key_id.eq(public_key_id))
            .count()
            .get_result(self)?)
    }

    fn insert_deploy_key(&mut self, key: &NewDeployKey) -> Result<DeployKey, KeyError> {
        let now = to_naive(Utc::now());
        let row = diesel::insert_into(deploy_key::table)
            .values(&NewDeployKeyRow {
                key_id: key.key_id,
                repo_id: key.repo_id,
                name: &key.name,
                fingerprint: &key.fingerprint,
                mode: key.mode.as_i32(),
                created_at: now,
                updated_at: now,
            })
            .returning(DeployKeyRow::as_returning())
            .get_result(self)?;
        Ok(DeployKey::from(row))
    }

    fn delete_deploy_key(&mut self, row_id: i64) -> Result<usize, KeyError> {
        Ok(diesel::delete(deploy_key::table.filter(deploy_key::id.eq(row_id))).execute(self)?)
    }
}
