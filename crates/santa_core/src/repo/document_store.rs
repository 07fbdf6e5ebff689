//! JSON document store for deployments without a database.
//!
//! # Responsibility
//! - Persist tokens and assignments as one JSON document on local disk.
//! - Serve reads from an in-memory copy loaded at open.
//!
//! # Invariants
//! - Every mutation is written to a sibling temp file and renamed over the
//!   document; the in-memory copy changes only after the rename succeeds.
//! - A missing document is created empty at open.
//! - A first draw re-reads the file under the lock and keeps any set
//!   already stored there. Handles in separate processes are not
//!   file-locked against each other.

use crate::model::assignment::Assignment;
use crate::model::token::Token;
use crate::repo::{AssignmentRepository, RepoError, RepoResult, Store, TokenRepository};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    tokens: BTreeMap<String, Token>,
    #[serde(default)]
    assignments: Vec<Assignment>,
}

pub struct DocumentStore {
    path: PathBuf,
    state: Mutex<Document>,
}

impl DocumentStore {
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = if path.exists() {
            read_document(&path)?
        } else {
            let empty = Document::default();
            write_document(&path, &empty)?;
            info!(
                "event=document_create module=repo status=ok path={}",
                path.display()
            );
            empty
        };

        Ok(Self {
            path,
            state: Mutex::new(document),
        })
    }

    fn state(&self) -> MutexGuard<'_, Document> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to a copy of the document, persists it, then swaps it in.
    fn mutate<T>(&self, change: impl FnOnce(&mut Document) -> RepoResult<T>) -> RepoResult<T> {
        let mut state = self.state();
        let mut next = state.clone();
        let output = change(&mut next)?;
        if next != *state {
            write_document(&self.path, &next)?;
            *state = next;
        }
        Ok(output)
    }
}

impl AssignmentRepository for DocumentStore {
    fn upsert_assignments(&self, assignments: &[Assignment]) -> RepoResult<()> {
        self.mutate(|doc| {
            for assignment in assignments {
                if assignment.is_self_assignment() {
                    return Err(RepoError::InvalidData(format!(
                        "self assignment for giver `{}`",
                        assignment.giver_name
                    )));
                }
                match doc
                    .assignments
                    .iter_mut()
                    .find(|existing| existing.giver_token == assignment.giver_token)
                {
                    Some(existing) => *existing = assignment.clone(),
                    None => doc.assignments.push(assignment.clone()),
                }
            }
            Ok(())
        })
    }

    fn insert_assignments_if_empty(
        &self,
        assignments: &[Assignment],
    ) -> RepoResult<Vec<Assignment>> {
        let mut state = self.state();
        // Re-read so a set written through another handle is not overwritten.
        let mut next = read_document(&self.path)?;
        if next.assignments.is_empty() {
            if let Some(bad) = assignments.iter().find(|a| a.is_self_assignment()) {
                return Err(RepoError::InvalidData(format!(
                    "self assignment for giver `{}`",
                    bad.giver_name
                )));
            }
            next.assignments = assignments.to_vec();
            write_document(&self.path, &next)?;
        }
        *state = next;
        Ok(state.assignments.clone())
    }

    fn list_assignments(&self) -> RepoResult<Vec<Assignment>> {
        Ok(self.state().assignments.clone())
    }

    fn get_assignment(&self, giver_token: &Token) -> RepoResult<Option<Assignment>> {
        Ok(self
            .state()
            .assignments
            .iter()
            .find(|assignment| &assignment.giver_token == giver_token)
            .cloned())
    }

    fn reset_assignments(&self) -> RepoResult<()> {
        self.mutate(|doc| {
            doc.assignments.clear();
            Ok(())
        })
    }

    fn ping(&self) -> RepoResult<()> {
        read_document(&self.path).map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "document"
    }
}

impl TokenRepository for DocumentStore {
    fn get_token(&self, name: &str) -> RepoResult<Option<Token>> {
        Ok(self.state().tokens.get(name).cloned())
    }

    fn insert_token_if_absent(&self, name: &str, token: &Token) -> RepoResult<Token> {
        self.mutate(|doc| {
            if doc.tokens.values().any(|existing| existing == token)
                && !doc.tokens.contains_key(name)
            {
                return Err(RepoError::InvalidData(format!(
                    "token already issued to another participant (name `{name}`)"
                )));
            }
            Ok(doc
                .tokens
                .entry(name.to_string())
                .or_insert_with(|| token.clone())
                .clone())
        })
    }

    fn find_name(&self, token: &Token) -> RepoResult<Option<String>> {
        Ok(self
            .state()
            .tokens
            .iter()
            .find(|(_, issued)| *issued == token)
            .map(|(name, _)| name.clone()))
    }

    fn list_tokens(&self) -> RepoResult<Vec<(String, Token)>> {
        Ok(self
            .state()
            .tokens
            .iter()
            .map(|(name, token)| (name.clone(), token.clone()))
            .collect())
    }
}

impl Store for DocumentStore {}

fn read_document(path: &Path) -> RepoResult<Document> {
    let json = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
    Ok(serde_json::from_str(&json)?)
}

fn write_document(path: &Path, document: &Document) -> RepoResult<()> {
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let json = serde_json::to_vec_pretty(document)?;
    fs::write(&tmp_path, json).map_err(|source| io_error(&tmp_path, source))?;
    fs::rename(&tmp_path, path).map_err(|source| {
        error!(
            "event=document_write module=repo status=error path={} error={}",
            path.display(),
            source
        );
        io_error(path, source)
    })
}

fn io_error(path: &Path, source: std::io::Error) -> RepoError {
    RepoError::Io {
        path: path.to_path_buf(),
        source,
    }
}
