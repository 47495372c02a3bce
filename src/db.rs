use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{LauncherError, LauncherResult, LockResultExt};
use crate::search_key::derive_search_key;

pub const DB_FILE_NAME: &str = "folders.db";
pub const DEFAULT_COLOR: &str = "#007acc";
pub const ADD_FOLDER_HOTKEY_KEY: &str = "hotkey_add_folder";
pub const THEME_KEY: &str = "theme";

/// Seeded on every initialization with insert-if-absent semantics.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (ADD_FOLDER_HOTKEY_KEY, "CommandOrControl+Alt+A"),
    (THEME_KEY, "light"),
];

/// Columns added after the first release, with the definition used to add
/// them to an older `folders` table.
const OPTIONAL_FOLDER_COLUMNS: &[(&str, &str)] = &[
    ("icon", "icon TEXT"),
    ("color", "color TEXT DEFAULT '#007acc'"),
    ("search_key", "search_key TEXT"),
];

const FOLDER_SELECT: &str = "SELECT id, name, path, icon, COALESCE(color, '#007acc'),
        COALESCE(search_key, name), created_at, updated_at
     FROM folders";

// ============================================
// Database Models
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub icon: Option<String>,
    pub color: String,
    pub search_key: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields the UI supplies when creating or editing a folder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderInput {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl FolderInput {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            icon: None,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Copy with surrounding whitespace removed from name and path, so
    /// `" /a"` and `"/a"` are the same folder.
    fn trimmed(&self) -> FolderInput {
        FolderInput {
            name: self.name.trim().to_string(),
            path: self.path.trim().to_string(),
            icon: self.icon.clone(),
            color: self.color.clone(),
        }
    }

    fn validate(&self) -> LauncherResult<()> {
        if self.name.trim().is_empty() {
            return Err(LauncherError::InvalidInput(
                "folder name must not be empty".to_string(),
            ));
        }
        if self.path.trim().is_empty() {
            return Err(LauncherError::InvalidInput(
                "folder path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn color_or_default(&self) -> String {
        self.color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COLOR)
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderSort {
    /// Most recently added first.
    #[default]
    Recent,
    Name,
    Updated,
}

impl FolderSort {
    /// Maps the UI's sort key; unknown keys (the old UI sends "smart") use
    /// the default order.
    pub fn from_key(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            Some("name") => FolderSort::Name,
            Some("updated") => FolderSort::Updated,
            _ => FolderSort::Recent,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            FolderSort::Recent => "created_at DESC, id DESC",
            FolderSort::Name => "name COLLATE NOCASE ASC, id ASC",
            FolderSort::Updated => "updated_at DESC, id DESC",
        }
    }
}

// ============================================
// Folder Store
// ============================================

enum StoreState {
    Uninitialized,
    Open(Connection),
}

pub struct FolderStore {
    db_path: PathBuf,
    state: Mutex<StoreState>,
}

impl FolderStore {
    /// Does no I/O; call [`FolderStore::initialize`] before anything else.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            state: Mutex::new(StoreState::Uninitialized),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, StoreState::Open(_)))
            .unwrap_or(false)
    }

    /// Creates the data directory and database file if needed, ensures the
    /// tables exist, seeds default settings and adds missing optional columns.
    pub fn initialize(&self) -> LauncherResult<()> {
        let mut state = self.state.lock().map_lock_err("folder store")?;
        if matches!(*state, StoreState::Open(_)) {
            return Ok(());
        }

        log::info!("opening folder store at {}", self.db_path.display());
        let conn = self.open_connection()?;

        if let Err(err) = seed_default_settings(&conn) {
            log::warn!("failed to seed default settings: {err}");
        }

        // A fresh table already has every column; failures here never block startup.
        match migrate_folder_columns(&conn) {
            Ok(added) if !added.is_empty() => {
                log::info!("added folder columns: {}", added.join(", "));
            }
            Ok(_) => {}
            Err(err) => log::warn!("{err}"),
        }

        *state = StoreState::Open(conn);
        Ok(())
    }

    fn open_connection(&self) -> LauncherResult<Connection> {
        let init_err = |reason: String| LauncherError::StoreInit {
            path: self.db_path.display().to_string(),
            reason,
        };

        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| init_err(format!("cannot create data directory: {e}")))?;
        }

        let conn = Connection::open(&self.db_path)
            .map_err(|e| init_err(format!("cannot open database: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| init_err(e.to_string()))?;
        create_tables(&conn).map_err(|e| init_err(format!("cannot create tables: {e}")))?;
        register_casefold(&conn).map_err(|e| init_err(e.to_string()))?;
        Ok(conn)
    }

    /// Releases the connection. Safe to call repeatedly or before `initialize`.
    pub fn close(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let StoreState::Open(conn) = std::mem::replace(&mut *state, StoreState::Uninitialized) {
            if let Err((_, err)) = conn.close() {
                log::error!("failed to close folder store: {err}");
            } else {
                log::info!("folder store closed");
            }
        }
    }

    fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> LauncherResult<T>,
    ) -> LauncherResult<T> {
        let state = self.state.lock().map_lock_err("folder store")?;
        match &*state {
            StoreState::Open(conn) => op(conn),
            StoreState::Uninitialized => Err(LauncherError::StoreNotInitialized),
        }
    }

    // ============================================
    // Folder CRUD
    // ============================================

    pub fn add_folder(&self, input: &FolderInput) -> LauncherResult<Folder> {
        let input = &input.trimmed();
        input.validate()?;
        let search_key = derive_search_key(&input.name);
        let color = input.color_or_default();

        self.with_conn(|conn| {
            let now = chrono::Utc::now().timestamp_millis();
            conn.execute(
                "INSERT INTO folders (name, path, icon, color, search_key, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![input.name, input.path, input.icon, color, search_key, now, now],
            )
            .map_err(|e| map_write_error(e, &input.path))?;

            let id = conn.last_insert_rowid();
            log::info!("added folder {id}: {}", input.path);
            Ok(Folder {
                id,
                name: input.name.clone(),
                path: input.path.clone(),
                icon: input.icon.clone(),
                color,
                search_key,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Returns `false` when no folder has `id`.
    pub fn update_folder(&self, id: i64, input: &FolderInput) -> LauncherResult<bool> {
        let input = &input.trimmed();
        input.validate()?;
        let search_key = derive_search_key(&input.name);
        let color = input.color_or_default();

        self.with_conn(|conn| {
            let now = chrono::Utc::now().timestamp_millis();
            let changed = conn
                .execute(
                    "UPDATE folders
                     SET name = ?1, path = ?2, icon = ?3, color = ?4, search_key = ?5, updated_at = ?6
                     WHERE id = ?7",
                    params![input.name, input.path, input.icon, color, search_key, now, id],
                )
                .map_err(|e| map_write_error(e, &input.path))?;
            log::debug!("update folder {id}: {changed} row(s)");
            Ok(changed > 0)
        })
    }

    /// Returns `false` when no folder has `id`.
    pub fn delete_folder(&self, id: i64) -> LauncherResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM folders WHERE id = ?1", params![id])?;
            log::debug!("delete folder {id}: {changed} row(s)");
            Ok(changed > 0)
        })
    }

    pub fn list_folders(&self, sort: FolderSort) -> LauncherResult<Vec<Folder>> {
        self.with_conn(|conn| {
            let sql = format!("{FOLDER_SELECT} ORDER BY {}", sort.order_by());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], folder_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Case-insensitive substring match on name, path or search key. Case is
    /// folded with Unicode rules, so "über" finds "Über". An empty keyword
    /// returns every folder.
    pub fn search_folders(&self, keyword: &str) -> LauncherResult<Vec<Folder>> {
        let pattern = format!("%{}%", escape_like(&keyword.to_lowercase()));
        self.with_conn(|conn| {
            let sql = format!(
                r"{FOLDER_SELECT}
                 WHERE casefold(name) LIKE ?1 ESCAPE '\'
                    OR casefold(path) LIKE ?1 ESCAPE '\'
                    OR casefold(COALESCE(search_key, name)) LIKE ?1 ESCAPE '\'
                 ORDER BY {}",
                FolderSort::Recent.order_by()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![pattern], folder_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn get_folder_by_path(&self, path: &str) -> LauncherResult<Option<Folder>> {
        self.with_conn(|conn| {
            let sql = format!("{FOLDER_SELECT} WHERE path = ?1");
            Ok(conn
                .query_row(&sql, params![path], folder_from_row)
                .optional()?)
        })
    }

    // ============================================
    // Settings
    // ============================================

    pub fn get_setting(&self, key: &str) -> LauncherResult<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> LauncherResult<()> {
        if key.trim().is_empty() {
            return Err(LauncherError::InvalidInput(
                "setting key must not be empty".to_string(),
            ));
        }
        self.with_conn(|conn| {
            let now = chrono::Utc::now().timestamp_millis();
            conn.execute(
                "INSERT INTO settings (key, value, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            log::info!("setting {key} saved");
            Ok(())
        })
    }

    pub fn get_all_settings(&self) -> LauncherResult<BTreeMap<String, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            Ok(rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()?)
        })
    }
}

impl Drop for FolderStore {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================
// Schema
// ============================================

fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS folders (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            path            TEXT NOT NULL UNIQUE,
            icon            TEXT,
            color           TEXT DEFAULT '#007acc',
            search_key      TEXT,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            key             TEXT PRIMARY KEY,
            value           TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_folders_created_at
            ON folders(created_at DESC);
        ",
    )
}

/// `casefold(text)`: Unicode lowercase. SQLite's own `LIKE` only folds ASCII.
fn register_casefold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn seed_default_settings(conn: &Connection) -> rusqlite::Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO settings (key, value, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
    )?;
    for (key, value) in DEFAULT_SETTINGS {
        stmt.execute(params![key, value, now])?;
    }
    Ok(())
}

fn folder_columns(conn: &Connection) -> rusqlite::Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(folders)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}

/// Adds every optional column missing from the live `folders` table and
/// returns the names of the columns it added. Running it again is a no-op.
fn migrate_folder_columns(conn: &Connection) -> LauncherResult<Vec<&'static str>> {
    let existing = folder_columns(conn)
        .map_err(|e| LauncherError::Migration(format!("cannot inspect folders table: {e}")))?;

    let mut added = Vec::new();
    for (name, definition) in OPTIONAL_FOLDER_COLUMNS {
        if existing.contains(*name) {
            continue;
        }
        conn.execute_batch(&format!("ALTER TABLE folders ADD COLUMN {definition};"))
            .map_err(|e| LauncherError::Migration(format!("cannot add column {name}: {e}")))?;
        added.push(*name);
    }
    Ok(added)
}

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        icon: row.get(3)?,
        color: row.get(4)?,
        search_key: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_write_error(err: rusqlite::Error, path: &str) -> LauncherError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == ErrorCode::ConstraintViolation
                && code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            LauncherError::DuplicatePath {
                path: path.to_string(),
            }
        }
        _ => LauncherError::Database(err),
    }
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
