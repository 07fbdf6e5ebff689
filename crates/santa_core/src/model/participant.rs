//! Participant and roster model.
//!
//! # Responsibility
//! - Define roster entries as loaded from seed data.
//! - Validate a roster before any token or draw work touches it.
//!
//! # Invariants
//! - Names are trimmed, non-empty, and unique within a roster.
//! - Roster order is preserved; it defines the draw's index order.
//! - A participant's token never changes once issued.

use crate::model::token::Token;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_ROSTER_JSON: &str = include_str!("default_roster.json");

/// One roster entry before a token is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSeed {
    pub name: String,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub anniversary: Option<String>,
}

impl ParticipantSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            birthday: None,
            anniversary: None,
        }
    }

    pub fn with_dates(
        name: impl Into<String>,
        birthday: Option<&str>,
        anniversary: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            birthday: birthday.map(str::to_string),
            anniversary: anniversary.map(str::to_string),
        }
    }
}

/// Roster entry with its capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub birthday: Option<String>,
    pub anniversary: Option<String>,
    pub token: Token,
}

impl Participant {
    pub fn from_seed(seed: &ParticipantSeed, token: Token) -> Self {
        Self {
            name: seed.name.clone(),
            birthday: seed.birthday.clone(),
            anniversary: seed.anniversary.clone(),
            token,
        }
    }
}

/// Roster loading and validation failures.
#[derive(Debug)]
pub enum RosterError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    EmptyName { index: usize },
    DuplicateName(String),
}

impl Display for RosterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read roster `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid roster json: {err}"),
            Self::EmptyName { index } => write!(f, "roster entry {index} has an empty name"),
            Self::DuplicateName(name) => write!(f, "roster name `{name}` appears more than once"),
        }
    }
}

impl Error for RosterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::EmptyName { .. } | Self::DuplicateName(_) => None,
        }
    }
}

/// Normalizes and validates roster entries.
///
/// Trims names and date fields; blank dates become `None`.
pub fn validate_roster(seeds: Vec<ParticipantSeed>) -> Result<Vec<ParticipantSeed>, RosterError> {
    let mut seen = HashSet::with_capacity(seeds.len());
    let mut roster = Vec::with_capacity(seeds.len());

    for (index, seed) in seeds.into_iter().enumerate() {
        let name = seed.name.trim().to_string();
        if name.is_empty() {
            return Err(RosterError::EmptyName { index });
        }
        if !seen.insert(name.clone()) {
            return Err(RosterError::DuplicateName(name));
        }
        roster.push(ParticipantSeed {
            name,
            birthday: normalize_date(seed.birthday),
            anniversary: normalize_date(seed.anniversary),
        });
    }

    Ok(roster)
}

/// Parses a JSON array of roster entries.
pub fn parse_roster(json: &str) -> Result<Vec<ParticipantSeed>, RosterError> {
    let seeds: Vec<ParticipantSeed> = serde_json::from_str(json).map_err(RosterError::Parse)?;
    validate_roster(seeds)
}

/// Reads and validates a roster file.
pub fn load_roster(path: impl AsRef<Path>) -> Result<Vec<ParticipantSeed>, RosterError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_roster(&json)
}

/// Returns the roster bundled with the binary.
pub fn default_roster() -> Result<Vec<ParticipantSeed>, RosterError> {
    parse_roster(DEFAULT_ROSTER_JSON)
}

fn normalize_date(value: Option<String>) -> Option<String> {
    value
        .map(|date| date.trim().to_string())
        .filter(|date| !date.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{default_roster, parse_roster, validate_roster, ParticipantSeed, RosterError};

    #[test]
    fn bundled_roster_is_valid_and_drawable() {
        let roster = default_roster().expect("bundled roster should parse");
        assert!(roster.len() >= 2);
    }

    #[test]
    fn validate_trims_names_and_blank_dates() {
        let roster = validate_roster(vec![ParticipantSeed::with_dates(
            "  Alice ",
            Some(" 03-14 "),
            Some("   "),
        )])
        .unwrap();
        assert_eq!(roster[0].name, "Alice");
        assert_eq!(roster[0].birthday.as_deref(), Some("03-14"));
        assert_eq!(roster[0].anniversary, None);
    }

    #[test]
    fn validate_rejects_empty_name() {
        let err = validate_roster(vec![ParticipantSeed::new("Alice"), ParticipantSeed::new(" ")])
            .unwrap_err();
        assert!(matches!(err, RosterError::EmptyName { index: 1 }));
    }

    #[test]
    fn validate_rejects_duplicates_after_trim() {
        let err = validate_roster(vec![ParticipantSeed::new("Bob"), ParticipantSeed::new("Bob ")])
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateName(name) if name == "Bob"));
    }

    #[test]
    fn parse_accepts_missing_dates() {
        let roster = parse_roster(r#"[{"name":"Alice"},{"name":"Bob","birthday":"01-02"}]"#)
            .unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[1].birthday.as_deref(), Some("01-02"));
    }

    #[test]
    fn parse_reports_malformed_json() {
        assert!(matches!(
            parse_roster("{not json").unwrap_err(),
            RosterError::Parse(_)
        ));
    }
}
