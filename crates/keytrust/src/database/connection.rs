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

use crate::config::DatabaseConfig;
use crate::error::KeyError;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, PooledConnection};
use diesel::sqlite::SqliteConnection;

use super::schema::SCHEMA_STATEMENTS;

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Applies per-connection pragmas when the pool opens a connection.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        // Wait on locks instead of failing immediately.
        diesel::sql_query("PRAGMA busy_timeout = 30000;")
            .execute(conn)
            .map_err(r2d2::Error::QueryError)?;
        diesel::sql_query("PRAGMA foreign_keys = ON;")
            .execute(conn)
            .map_err(r2d2::Error::QueryError)?;
        Ok(())
    }
}

/// SQLite connection pool holding the key store schema.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database at `url` and ensure the schema exists.
    pub fn new(url: &str, pool_size: u32) -> Result<Self, KeyError> {
        tracing::info!("Opening key store database: {}", url);
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let mut builder = r2d2::Pool::builder()
            .max_size(pool_size.max(1))
            .connection_customizer(Box::new(SqlitePragmas));

        // An in-memory database lives only as long as one of its connections.
        if url.contains("mode=memory") || url == ":memory:" {
            builder = builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = builder.build(manager)?;
        let db = Self { pool };
        db.initialize_schema()?;
        Ok(db)
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, KeyError> {
        Self::new(&config.url, config.pool_size)
    }

    /// A private in-memory database, mostly for tests.
    pub fn in_memory() -> Result<Self, KeyError> {
        let url = format!(
            "file:keytrust_{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        Self::new(&url, 1)
    }

    pub fn get_connection(&self) -> Result<DbConnection, KeyError> {
        Ok(self.pool.get()?)
    }

    fn initialize_schema(&self) -> Result<(), KeyError> {
        tracing::debug!("Initializing key store schema");
        let mut conn = self.get_connection()?;
        for statement in SCHEMA_STATEMENTS {
            diesel::sql_query(*statement).execute(&mut conn)?;
        }
        tracing::debug!("Key store schema initialization complete");
        Ok(())
    }
}
