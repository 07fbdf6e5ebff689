//! SQLite-backed token and assignment store.
//!
//! # Responsibility
//! - Keep SQL details inside the persistence boundary.
//! - Serialize access to one connection shared by request handlers.
//!
//! # Invariants
//! - Batch upserts run in one transaction.
//! - A first draw is written with `BEGIN IMMEDIATE`, so handles in other
//!   processes see either no assignments or the whole set.
//! - Read paths reject malformed persisted tokens instead of masking them.

use crate::db::{open_db, open_db_in_memory};
use crate::model::assignment::Assignment;
use crate::model::token::Token;
use crate::repo::{AssignmentRepository, RepoError, RepoResult, Store, TokenRepository};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    giver_token,
    giver_name,
    receiver_token,
    receiver_name
FROM assignments";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) a database file with the given lock wait bound.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> RepoResult<Self> {
        Ok(Self::from_connection(open_db(path, busy_timeout)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection that already has migrations applied.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-call cannot leave a half-applied transaction behind:
        // rusqlite rolls back on drop.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssignmentRepository for SqliteStore {
    fn upsert_assignments(&self, assignments: &[Assignment]) -> RepoResult<()> {
        reject_self_assignments(assignments)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_assignments(
            &tx,
            assignments,
            "ON CONFLICT(giver_token) DO UPDATE SET
                giver_name = excluded.giver_name,
                receiver_token = excluded.receiver_token,
                receiver_name = excluded.receiver_name",
        )?;
        tx.commit()?;
        Ok(())
    }

    fn insert_assignments_if_empty(
        &self,
        assignments: &[Assignment],
    ) -> RepoResult<Vec<Assignment>> {
        reject_self_assignments(assignments)?;

        let mut conn = self.conn();
        // Write lock is held from the emptiness check through commit.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored: i64 =
            tx.query_row("SELECT COUNT(*) FROM assignments;", [], |row| row.get(0))?;
        if stored > 0 {
            let existing = select_assignments(&tx)?;
            tx.commit()?;
            return Ok(existing);
        }

        write_assignments(&tx, assignments, "")?;
        tx.commit()?;
        Ok(assignments.to_vec())
    }

    fn list_assignments(&self) -> RepoResult<Vec<Assignment>> {
        select_assignments(&self.conn())
    }

    fn get_assignment(&self, giver_token: &Token) -> RepoResult<Option<Assignment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{ASSIGNMENT_SELECT_SQL} WHERE giver_token = ?1;"))?;
        let mut rows = stmt.query([giver_token.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_assignment_row(row)?));
        }

        Ok(None)
    }

    fn reset_assignments(&self) -> RepoResult<()> {
        self.conn().execute("DELETE FROM assignments;", [])?;
        Ok(())
    }

    fn ping(&self) -> RepoResult<()> {
        self.conn()
            .query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

impl TokenRepository for SqliteStore {
    fn get_token(&self, name: &str) -> RepoResult<Option<Token>> {
        let text = self
            .conn()
            .query_row(
                "SELECT token FROM participant_tokens WHERE name = ?1;",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        text.map(|value| parse_token(&value, "participant_tokens.token"))
            .transpose()
    }

    fn insert_token_if_absent(&self, name: &str, token: &Token) -> RepoResult<Token> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO participant_tokens (name, token) VALUES (?1, ?2)
             ON CONFLICT(name) DO NOTHING;",
            params![name, token.as_str()],
        )?;
        let stored: String = conn.query_row(
            "SELECT token FROM participant_tokens WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )?;
        parse_token(&stored, "participant_tokens.token")
    }

    fn find_name(&self, token: &Token) -> RepoResult<Option<String>> {
        let name = self
            .conn()
            .query_row(
                "SELECT name FROM participant_tokens WHERE token = ?1;",
                [token.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    fn list_tokens(&self) -> RepoResult<Vec<(String, Token)>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT name, token FROM participant_tokens ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tokens = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get("name")?;
            let token: String = row.get("token")?;
            tokens.push((name, parse_token(&token, "participant_tokens.token")?));
        }
        Ok(tokens)
    }
}

impl Store for SqliteStore {}

fn reject_self_assignments(assignments: &[Assignment]) -> RepoResult<()> {
    match assignments.iter().find(|a| a.is_self_assignment()) {
        Some(bad) => Err(RepoError::InvalidData(format!(
            "self assignment for giver `{}`",
            bad.giver_name
        ))),
        None => Ok(()),
    }
}

/// Inserts every record on `conn`; `conflict` is appended to the INSERT.
fn write_assignments(
    conn: &Connection,
    assignments: &[Assignment],
    conflict: &str,
) -> RepoResult<()> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO assignments (
            giver_token,
            giver_name,
            receiver_token,
            receiver_name
        ) VALUES (?1, ?2, ?3, ?4)
        {conflict};"
    ))?;
    for assignment in assignments {
        stmt.execute(params![
            assignment.giver_token.as_str(),
            assignment.giver_name.as_str(),
            assignment.receiver_token.as_str(),
            assignment.receiver_name.as_str(),
        ])?;
    }
    Ok(())
}

fn select_assignments(conn: &Connection) -> RepoResult<Vec<Assignment>> {
    let mut stmt = conn.prepare(&format!("{ASSIGNMENT_SELECT_SQL} ORDER BY rowid ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut assignments = Vec::new();
    while let Some(row) = rows.next()? {
        assignments.push(parse_assignment_row(row)?);
    }
    Ok(assignments)
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<Assignment> {
    let giver_token: String = row.get("giver_token")?;
    let receiver_token: String = row.get("receiver_token")?;
    Ok(Assignment {
        giver_token: parse_token(&giver_token, "assignments.giver_token")?,
        giver_name: row.get("giver_name")?,
        receiver_token: parse_token(&receiver_token, "assignments.receiver_token")?,
        receiver_name: row.get("receiver_name")?,
    })
}

fn parse_token(value: &str, column: &str) -> RepoResult<Token> {
    Token::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid token `{value}` in {column}")))
}
