//! Persistence contracts for tokens and assignments.
//!
//! # Responsibility
//! - Define the store contracts the draw service depends on.
//! - Provide two interchangeable backends: SQLite and a JSON document.
//! - Select one backend at startup from [`StoreBackend`].
//!
//! # Invariants
//! - `upsert_assignments` is keyed by giver token and all-or-nothing per batch.
//! - `insert_token_if_absent` never replaces an issued token.
//! - `reset_assignments` leaves issued tokens untouched.
//! - `ping` never mutates state.

use crate::db::DbError;
use crate::model::assignment::Assignment;
use crate::model::token::Token;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod document_store;
pub mod sqlite_store;

pub use document_store::DocumentStore;
pub use sqlite_store::SqliteStore;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage failure. Every variant means the backend could not serve the call.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Json(err) => write!(f, "document encoding failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Assignment persistence keyed by giver token.
pub trait AssignmentRepository {
    fn upsert_assignments(&self, assignments: &[Assignment]) -> RepoResult<()>;
    /// Writes `assignments` only when no assignment is stored yet.
    ///
    /// Returns the set in effect afterwards: `assignments` if they were
    /// written, otherwise the set that was already stored. The emptiness
    /// check and the write are atomic with respect to other handles on the
    /// same backend.
    fn insert_assignments_if_empty(
        &self,
        assignments: &[Assignment],
    ) -> RepoResult<Vec<Assignment>>;
    /// Returns all assignments in insertion order.
    fn list_assignments(&self) -> RepoResult<Vec<Assignment>>;
    fn get_assignment(&self, giver_token: &Token) -> RepoResult<Option<Assignment>>;
    fn reset_assignments(&self) -> RepoResult<()>;
    /// Confirms the backend is reachable without changing it.
    fn ping(&self) -> RepoResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Name → token persistence.
pub trait TokenRepository {
    fn get_token(&self, name: &str) -> RepoResult<Option<Token>>;
    /// Stores `token` for `name` unless one exists; returns the token in effect.
    fn insert_token_if_absent(&self, name: &str, token: &Token) -> RepoResult<Token>;
    fn find_name(&self, token: &Token) -> RepoResult<Option<String>>;
    fn list_tokens(&self) -> RepoResult<Vec<(String, Token)>>;
}

/// Combined store handle shared across request handlers.
pub trait Store: AssignmentRepository + TokenRepository + Send + Sync {}

/// Backend selection, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite { path: PathBuf, busy_timeout: Duration },
    Document { path: PathBuf },
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => "sqlite",
            Self::Document { .. } => "document",
        }
    }
}

/// Opens the configured backend.
pub fn open_store(backend: &StoreBackend) -> RepoResult<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match backend {
        StoreBackend::Sqlite { path, busy_timeout } => {
            Arc::new(SqliteStore::open(path, *busy_timeout)?)
        }
        StoreBackend::Document { path } => Arc::new(DocumentStore::open(path)?),
    };
    info!(
        "event=store_open module=repo status=ok backend={}",
        store.backend_name()
    );
    Ok(store)
}
