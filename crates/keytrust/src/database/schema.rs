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

diesel::table! {
    gpg_key (id) {
        id -> BigInt,
        owner_id -> BigInt,
        key_id -> Text,
        primary_key_id -> Text,
        content -> Text,
        created_at -> Timestamp,
        expired_at -> Nullable<Timestamp>,
        added_at -> Timestamp,
        emails -> Text,
        verified -> Bool,
        can_sign -> Bool,
        can_encrypt_comms -> Bool,
        can_encrypt_storage -> Bool,
        can_certify -> Bool,
    }
}

diesel::table! {
    gpg_key_import (key_id) {
        key_id -> Text,
        content -> Text,
    }
}

diesel::table! {
    public_key (id) {
        id -> BigInt,
        owner_id -> BigInt,
        name -> Text,
        fingerprint -> Text,
        content -> Text,
        mode -> Integer,
        key_type -> Integer,
        login_source_id -> BigInt,
        verified -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    deploy_key (id) {
        id -> BigInt,
        key_id -> BigInt,
        repo_id -> BigInt,
        name -> Text,
        fingerprint -> Text,
        mode -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(gpg_key, gpg_key_import, public_key, deploy_key);

/// Statements creating the schema. Each is idempotent.
pub(crate) const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS gpg_key (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id BIGINT NOT NULL,
        key_id TEXT NOT NULL,
        primary_key_id TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL,
        expired_at TIMESTAMP NULL,
        added_at TIMESTAMP NOT NULL,
        emails TEXT NOT NULL DEFAULT '[]',
        verified BOOLEAN NOT NULL DEFAULT FALSE,
        can_sign BOOLEAN NOT NULL DEFAULT FALSE,
        can_encrypt_comms BOOLEAN NOT NULL DEFAULT FALSE,
        can_encrypt_storage BOOLEAN NOT NULL DEFAULT FALSE,
        can_certify BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_gpg_key_owner_id ON gpg_key (owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_gpg_key_key_id ON gpg_key (key_id)",
    "CREATE INDEX IF NOT EXISTS idx_gpg_key_primary_key_id ON gpg_key (primary_key_id)",
    r#"
    CREATE TABLE IF NOT EXISTS gpg_key_import (
        key_id TEXT PRIMARY KEY NOT NULL,
        content TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS public_key (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id BIGINT NOT NULL,
        name TEXT NOT NULL,
        fingerprint TEXT NOT NULL,
        content TEXT NOT NULL,
        mode INTEGER NOT NULL DEFAULT 2,
        key_type INTEGER NOT NULL DEFAULT 1,
        login_source_id BIGINT NOT NULL DEFAULT 0,
        verified BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_public_key_owner_id ON public_key (owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_public_key_fingerprint ON public_key (fingerprint)",
    r#"
    CREATE TABLE IF NOT EXISTS deploy_key (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key_id BIGINT NOT NULL,
        repo_id BIGINT NOT NULL,
        name TEXT NOT NULL,
        fingerprint TEXT NOT NULL,
        mode INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        UNIQUE (key_id, repo_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_deploy_key_repo_id ON deploy_key (repo_id)",
];
