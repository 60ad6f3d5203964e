//! SQLite-backed store.
//!
//! One connection behind a mutex. Every statement is short and runs with the
//! lock held, so a purge `DELETE` and a concurrent soft-delete `UPDATE` are
//! serialized by SQLite and the mutex alike.

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{Book, NewBook, NewUser, RecordKind, User, UserUpdate};
use crate::storage::{SoftDeleteStore, Storage, StoreError, StoreResult};

struct Table {
    name: &'static str,
    schema: &'static str,
    indices: &'static [&'static str],
}

const USERS_TABLE: Table = Table {
    name: "users",
    schema: "CREATE TABLE users (uid TEXT NOT NULL, name TEXT NOT NULL, email TEXT NOT NULL, pass_hash TEXT NOT NULL, deleted INTEGER NOT NULL DEFAULT 0, PRIMARY KEY (uid));",
    // Soft-deleted users release their email.
    indices: &["CREATE UNIQUE INDEX users_active_email ON users (email) WHERE deleted = 0;"],
};

const BOOKS_TABLE: Table = Table {
    name: "books",
    schema: "CREATE TABLE books (bid TEXT NOT NULL, label TEXT NOT NULL, author TEXT NOT NULL, deleted INTEGER NOT NULL DEFAULT 0, user_uid TEXT NOT NULL, created_at TEXT NOT NULL, PRIMARY KEY (bid));",
    indices: &["CREATE INDEX books_user_uid ON books (user_uid);"],
};

const TABLES: &[Table] = &[USERS_TABLE, BOOKS_TABLE];

/// Written to `PRAGMA user_version` when the schema is created.
pub const SCHEMA_VERSION: u32 = 1;

const USER_COLUMNS: &str = "uid, name, email, pass_hash, deleted";
const BOOK_COLUMNS: &str = "bid, label, author, deleted, user_uid, created_at";

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        uid: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        pass_hash: row.get(3)?,
        deleted: row.get(4)?,
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        bid: row.get(0)?,
        label: row.get(1)?,
        author: row.get(2)?,
        deleted: row.get(3)?,
        user_uid: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Table name and key column for a purgeable kind.
fn table_for(kind: RecordKind) -> (&'static str, &'static str) {
    match kind {
        RecordKind::Books => (BOOKS_TABLE.name, "bid"),
        RecordKind::Users => (USERS_TABLE.name, "uid"),
    }
}

#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(backend)?;
        Self::init(conn)
    }

    /// A private database that lives as long as the store.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(backend)?;

        match version {
            0 => {
                Self::create_schema(&conn).map_err(backend)?;
                tracing::info!(version = SCHEMA_VERSION, "Created database schema");
            }
            SCHEMA_VERSION => tracing::debug!(version, "Opened existing database"),
            other => {
                return Err(StoreError::Backend(format!(
                    "database schema version {other} is not supported (expected {SCHEMA_VERSION})"
                )))
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
        for table in TABLES {
            conn.execute(table.schema, [])?;
            for index in table.indices {
                conn.execute(index, [])?;
            }
        }
        conn.execute(&format!("PRAGMA user_version = {SCHEMA_VERSION}"), [])?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection mutex poisoned".into()))
    }

    /// Rows of `kind` physically present, soft-deleted ones included.
    pub fn stored_len(&self, kind: RecordKind) -> StoreResult<u64> {
        let (table, _) = table_for(kind);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(backend)?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl SoftDeleteStore for SqliteStore {
    async fn mark_deleted(&self, kind: RecordKind, id: &str) -> StoreResult<()> {
        let (table, key) = table_for(kind);
        let conn = self.lock()?;
        let changed = conn
            .execute(
                &format!("UPDATE {table} SET deleted = 1 WHERE {key} = ?1 AND deleted = 0"),
                params![id],
            )
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn purge_deleted(&self, kind: RecordKind) -> StoreResult<u64> {
        let (table, _) = table_for(kind);
        let conn = self.lock()?;
        let removed = conn
            .execute(&format!("DELETE FROM {table} WHERE deleted = 1"), [])
            .map_err(backend)?;
        Ok(removed as u64)
    }
}

#[async_trait]
impl Storage for SqliteStore {
    async fn save_user(&self, user: NewUser) -> StoreResult<String> {
        let uid = uuid::Uuid::new_v4().to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (uid, name, email, pass_hash) VALUES (?1, ?2, ?3, ?4)",
            params![uid, user.name, user.email, user.pass_hash],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists(user.email.clone())
            } else {
                backend(e)
            }
        })?;
        Ok(uid)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<User> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 AND deleted = 0"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(backend)?
        .ok_or(StoreError::InvalidCredentials)
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE deleted = 0"))
            .map_err(backend)?;
        let users = stmt
            .query_map([], user_from_row)
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        if users.is_empty() {
            return Err(StoreError::Empty(RecordKind::Users));
        }
        Ok(users)
    }

    async fn update_user(&self, uid: &str, update: UserUpdate) -> StoreResult<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE users SET name = ?1, email = ?2, pass_hash = ?3 WHERE uid = ?4 AND deleted = 0",
                params![update.name, update.email, update.pass_hash, uid],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::AlreadyExists(update.email.clone())
                } else {
                    backend(e)
                }
            })?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: RecordKind::Users,
                id: uid.to_string(),
            });
        }
        Ok(())
    }

    async fn save_book(&self, book: NewBook) -> StoreResult<String> {
        let bid = uuid::Uuid::new_v4().to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO books (bid, label, author, user_uid, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![bid, book.label, book.author, book.user_uid, chrono::Utc::now()],
        )
        .map_err(backend)?;
        Ok(bid)
    }

    async fn book(&self, bid: &str) -> StoreResult<Book> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {BOOK_COLUMNS} FROM books WHERE bid = ?1 AND deleted = 0"),
            params![bid],
            book_from_row,
        )
        .optional()
        .map_err(backend)?
        .ok_or_else(|| StoreError::NotFound {
            kind: RecordKind::Books,
            id: bid.to_string(),
        })
    }

    async fn books(&self) -> StoreResult<Vec<Book>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOK_COLUMNS} FROM books WHERE deleted = 0 ORDER BY created_at"
            ))
            .map_err(backend)?;
        let books = stmt
            .query_map([], book_from_row)
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        if books.is_empty() {
            return Err(StoreError::Empty(RecordKind::Books));
        }
        Ok(books)
    }

    async fn books_by_user(&self, uid: &str) -> StoreResult<Vec<Book>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOK_COLUMNS} FROM books WHERE user_uid = ?1 AND deleted = 0 ORDER BY created_at"
            ))
            .map_err(backend)?;
        let books = stmt
            .query_map(params![uid], book_from_row)
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        if books.is_empty() {
            return Err(StoreError::Empty(RecordKind::Books));
        }
        Ok(books)
    }
}
