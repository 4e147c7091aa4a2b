//! Local advisory cache.
//!
//! A small rusqlite key-value store holding the credential material and
//! odds and ends the client wants across launches: tokens, the profile
//! snapshot, the expiry stamp, and a pending payment reference. All of it
//! is advisory; the backend remains the source of truth for every value.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreError;
use crate::models::UserProfile;

const KEY_ACCESS_TOKEN: &str = "access_token";
const KEY_REFRESH_TOKEN: &str = "refresh_token";
const KEY_EXPIRES_AT: &str = "expires_at";
const KEY_PROFILE: &str = "profile";
const KEY_PENDING_PAYMENT: &str = "pending_payment_ref";

fn data_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| "C:\\Users\\User".to_string());
        PathBuf::from(home).join(".local\\share\\quizmate")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/home/user".to_string());
        PathBuf::from(home).join(".local/share/quizmate")
    }
}

pub fn store_path() -> PathBuf {
    data_dir().join("quizmate.db")
}

#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open_default() -> Result<Self, StoreError> {
        let path = store_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }

    pub fn save_credentials(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        self.put(KEY_ACCESS_TOKEN, access_token)?;
        self.put(KEY_REFRESH_TOKEN, refresh_token)?;
        self.put(KEY_EXPIRES_AT, &expires_at.to_string())?;
        Ok(())
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(KEY_ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(KEY_REFRESH_TOKEN)
    }

    /// Stored expiry as unix seconds. Advisory only: compared against the
    /// local clock at bootstrap, never enforced per request.
    pub fn expires_at(&self) -> Result<Option<i64>, StoreError> {
        let Some(raw) = self.get(KEY_EXPIRES_AT)? else {
            return Ok(None);
        };
        let parsed = raw.parse::<i64>().map_err(|e| StoreError::Corrupt {
            key: KEY_EXPIRES_AT.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(parsed))
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let json = serde_json::to_string(profile).map_err(|e| StoreError::Corrupt {
            key: KEY_PROFILE.to_string(),
            reason: e.to_string(),
        })?;
        self.put(KEY_PROFILE, &json)
    }

    pub fn profile(&self) -> Result<Option<UserProfile>, StoreError> {
        let Some(json) = self.get(KEY_PROFILE)? else {
            return Ok(None);
        };
        let profile = serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
            key: KEY_PROFILE.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(profile))
    }

    pub fn set_pending_payment(&self, reference: &str) -> Result<(), StoreError> {
        self.put(KEY_PENDING_PAYMENT, reference)
    }

    pub fn pending_payment(&self) -> Result<Option<String>, StoreError> {
        self.get(KEY_PENDING_PAYMENT)
    }

    pub fn clear_pending_payment(&self) -> Result<(), StoreError> {
        self.delete(KEY_PENDING_PAYMENT)
    }

    /// Wipe everything tied to the signed-in account in one pass:
    /// logout, expiry at bootstrap, and multi-session conflicts all
    /// funnel through here.
    pub fn clear_credentials(&self) -> Result<(), StoreError> {
        self.delete(KEY_ACCESS_TOKEN)?;
        self.delete(KEY_REFRESH_TOKEN)?;
        self.delete(KEY_EXPIRES_AT)?;
        self.delete(KEY_PROFILE)?;
        Ok(())
    }
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}
