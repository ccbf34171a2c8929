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

use super::{KeyStore, QueryFn};
use crate::database::Database;
use crate::error::KeyError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use diesel::connection::Connection;
use diesel::sqlite::SqliteConnection;

/// [`KeyStore`] backed by the SQLite [`Database`].
///
/// The query traits are implemented directly on `SqliteConnection`, so a
/// transaction hands its connection to the callback unchanged.
#[derive(Clone)]
pub struct SqliteKeyStore {
    db: Database,
}

impl SqliteKeyStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl KeyStore for SqliteKeyStore {
    fn transaction(&self, f: &mut QueryFn<'_>) -> Result<(), KeyError> {
        let mut pooled = self.db.get_connection()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.transaction::<(), KeyError, _>(|conn| f(conn))
    }

    fn connection(&self, f: &mut QueryFn<'_>) -> Result<(), KeyError> {
        let mut pooled = self.db.get_connection()?;
        let conn: &mut SqliteConnection = &mut pooled;
        f(conn)
    }
}

pub(super) fn to_naive(at: DateTime<Utc>) -> NaiveDateTime {
    at.naive_utc()
}

pub(super) fn from_naive(at: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at)
}
