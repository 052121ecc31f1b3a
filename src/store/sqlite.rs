use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::ShareStore;
use crate::error::StoreError;
use crate::state::data::{ShareLink, ShareStatus, SignatureRecord, SignatureSubmission};

const SHARE_COLUMNS: &str = "id, share_token, project_reference, title, message, company_name,
    photos_json, requires_signature, status, created_at, expires_at, view_count,
    last_viewed_at, signature_data, signer_name, signed_at";

/// Share store backed by a local SQLite file.
/// Used offline and in tests; the schema mirrors the hosted table.
pub struct SqliteShareStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteShareStore {
    /// Open (or create) the database at `path` and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::NotConfigured(format!("{}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path)?;
        info!(path = %path.display(), "share database opened");

        let store = SqliteShareStore {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Default location of the database file:
    /// - Linux: ~/.local/share/photo-signoff/shares.db
    /// - macOS: ~/Library/Application Support/photo-signoff/shares.db
    /// - Windows: %APPDATA%\photo-signoff\shares.db
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("photo-signoff");
        path.push("shares.db");
        Some(path)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.connection();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS photo_shares (
                id                  TEXT PRIMARY KEY,
                share_token         TEXT NOT NULL UNIQUE,
                project_reference   TEXT NOT NULL,
                title               TEXT,
                message             TEXT,
                company_name        TEXT,
                photos_json         TEXT NOT NULL DEFAULT '[]',
                requires_signature  INTEGER NOT NULL DEFAULT 0,
                status              TEXT NOT NULL DEFAULT 'active',
                created_at          TEXT NOT NULL,
                expires_at          TEXT,
                view_count          INTEGER NOT NULL DEFAULT 0,
                last_viewed_at      TEXT,
                signature_data      TEXT,
                signer_name         TEXT,
                signed_at           TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photo_shares_token
             ON photo_shares(share_token)",
            [],
        )?;

        debug!("share schema ready");
        Ok(())
    }

    fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock only means another statement panicked; the
        // connection itself is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a share record. Authoring happens elsewhere; this exists for
    /// seeding local databases.
    pub fn insert(&self, share: &ShareLink) -> Result<(), StoreError> {
        let photos_json = serde_json::to_string(&share.photos)?;
        let signature = share.signature.as_ref();

        self.connection().execute(
            "INSERT INTO photo_shares (
                id, share_token, project_reference, title, message, company_name,
                photos_json, requires_signature, status, created_at, expires_at,
                view_count, last_viewed_at, signature_data, signer_name, signed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            rusqlite::params![
                share.id,
                share.share_token,
                share.project_reference,
                share.title,
                share.message,
                share.company_name,
                photos_json,
                share.requires_signature,
                share.status.as_str(),
                share.created_at,
                share.expires_at,
                share.view_count,
                share.last_viewed_at,
                signature.map(|s| s.signature_data.as_str()),
                signature.map(|s| s.signer_name.as_str()),
                signature.map(|s| s.signed_at),
            ],
        )?;

        Ok(())
    }

    /// Seed from a JSON export: one share record or an array of them, in the
    /// same shape the REST table returns. Returns the imported tokens.
    pub fn import_json(&self, json: &str) -> Result<Vec<String>, StoreError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let shares: Vec<ShareLink> = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)?,
            other => vec![serde_json::from_value(other)?],
        };

        let mut tokens = Vec::with_capacity(shares.len());
        for share in &shares {
            self.insert(share)?;
            info!(share = %share.id, db = %self.db_path.display(), "imported share");
            tokens.push(share.share_token.clone());
        }
        Ok(tokens)
    }
}

/// Raw row as read from SQLite; photos are decoded afterwards so a bad
/// JSON blob surfaces as a decode error rather than a SQL one.
struct ShareRow {
    share: ShareLink,
    photos_json: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ShareRow> {
    let status: String = row.get(8)?;
    let signature_data: Option<String> = row.get(13)?;
    let signer_name: Option<String> = row.get(14)?;
    let signed_at: Option<DateTime<Utc>> = row.get(15)?;

    let signature = match (signature_data, signer_name, signed_at) {
        (Some(signature_data), Some(signer_name), Some(signed_at)) => Some(SignatureRecord {
            signature_data,
            signer_name,
            signed_at,
        }),
        _ => None,
    };

    Ok(ShareRow {
        share: ShareLink {
            id: row.get(0)?,
            share_token: row.get(1)?,
            project_reference: row.get(2)?,
            title: row.get(3)?,
            message: row.get(4)?,
            company_name: row.get(5)?,
            photos: Vec::new(),
            requires_signature: row.get(7)?,
            status: ShareStatus::parse(&status),
            created_at: row.get(9)?,
            expires_at: row.get(10)?,
            view_count: row.get(11)?,
            last_viewed_at: row.get(12)?,
            signature,
        },
        photos_json: row.get(6)?,
    })
}

#[async_trait]
impl ShareStore for SqliteShareStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<ShareLink>, StoreError> {
        let row = self
            .connection()
            .query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM photo_shares WHERE share_token = ?1"),
                [token],
                read_row,
            )
            .optional()?;

        match row {
            Some(ShareRow { mut share, photos_json }) => {
                share.photos = serde_json::from_str(&photos_json)?;
                Ok(Some(share))
            }
            None => Ok(None),
        }
    }

    async fn record_view(&self, share: &ShareLink, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.connection().execute(
            "UPDATE photo_shares SET view_count = view_count + 1, last_viewed_at = ?1 WHERE id = ?2",
            rusqlite::params![at, share.id],
        )?;
        Ok(())
    }

    async fn submit_signature(
        &self,
        id: &str,
        submission: &SignatureSubmission,
    ) -> Result<DateTime<Utc>, StoreError> {
        let signed_at = Utc::now();

        // Only an active share can be signed; a second submission loses.
        let updated = self.connection().execute(
            "UPDATE photo_shares
             SET signature_data = ?1, signer_name = ?2, signed_at = ?3, status = 'signed'
             WHERE id = ?4 AND status = 'active'",
            rusqlite::params![submission.signature_data, submission.signer_name, signed_at, id],
        )?;

        if updated == 0 {
            return Err(StoreError::AlreadySigned);
        }

        Ok(signed_at)
    }
}

impl std::fmt::Debug for SqliteShareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteShareStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
