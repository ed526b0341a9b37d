//! SQLite-backed user admin store.
//!
//! Plays the role of the hosted auth admin API: identities live here and
//! nowhere else. Passwords are never persisted; the generated temporary
//! password is handed to the caller once, who is expected to deliver it
//! out of band.

use super::user_models::{AdminUser, CreatedUser};
use super::user_store::UserAdminStore;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("email", &SqlType::Text, non_null = true),
        sqlite_column!("metadata", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_users_email", "email")],
    unique_constraints: &[&["email"]],
};

const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USERS_TABLE],
    migration: None,
}];

const TEMP_PASSWORD_LEN: usize = 16;

pub struct SqliteUserAdminStore {
    conn: Mutex<Connection>,
}

impl SqliteUserAdminStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).context("Failed to open user database")?;
        Self::prepare(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        let latest = &USER_VERSIONED_SCHEMAS[USER_VERSIONED_SCHEMAS.len() - 1];

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);

        if table_count == 0 {
            info!("Creating user db schema at version {}", latest.version);
            latest.create(&conn)?;
        } else {
            let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
            if (db_version as usize) < BASE_DB_VERSION {
                bail!("Not a user database (user_version = {})", db_version);
            }
            latest.validate(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<AdminUser> {
    let metadata: String = row.get(2)?;
    let metadata = serde_json::from_str(&metadata).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AdminUser {
        id: row.get(0)?,
        email: row.get(1)?,
        metadata,
        created_at: timestamp(row.get(3)?),
        updated_at: timestamp(row.get(4)?),
    })
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

impl UserAdminStore for SqliteUserAdminStore {
    fn list_users(&self) -> Result<Vec<AdminUser>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, email, metadata, created, updated FROM users")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(users)
    }

    fn get_user(&self, id: &str) -> Result<Option<AdminUser>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, email, metadata, created, updated FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to fetch user {}", id))
    }

    fn create_user(&self, email: &str, metadata: serde_json::Value) -> Result<CreatedUser> {
        let id = uuid::Uuid::new_v4().to_string();
        let temp_password: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TEMP_PASSWORD_LEN)
            .map(char::from)
            .collect();
        let now = Utc::now();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (id, email, metadata, created, updated) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, email, metadata.to_string(), now.timestamp()],
        )
        .with_context(|| format!("Failed to create user {}", email))?;

        Ok(CreatedUser {
            user: AdminUser {
                id,
                email: email.to_string(),
                metadata,
                created_at: timestamp(now.timestamp()),
                updated_at: timestamp(now.timestamp()),
            },
            temp_password,
        })
    }

    fn update_user(
        &self,
        id: &str,
        email: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if let Some(email) = email {
            conn.execute(
                "UPDATE users SET email = ?1, updated = ?2 WHERE id = ?3",
                params![email, Utc::now().timestamp(), id],
            )?;
        }
        if let Some(metadata) = metadata {
            conn.execute(
                "UPDATE users SET metadata = ?1, updated = ?2 WHERE id = ?3",
                params![metadata.to_string(), Utc::now().timestamp(), id],
            )?;
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM users WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete user {}", id))
    }
}
