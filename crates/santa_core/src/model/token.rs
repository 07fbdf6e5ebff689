//! Capability token model.
//!
//! # Responsibility
//! - Generate unguessable per-participant tokens.
//! - Parse untrusted token text before it reaches storage.
//!
//! # Invariants
//! - A token is exactly 32 lowercase hex characters (UUID v4, simple form).
//! - Tokens come from the OS CSPRNG; possession is the only credential.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{32}$").expect("valid token regex"));

/// Opaque capability identifying one participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parses caller-supplied token text.
    ///
    /// Returns `None` for anything that could not have been issued by
    /// [`Token::generate`]; surrounding whitespace is ignored and hex is
    /// matched case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        TOKEN_RE
            .is_match(&normalized)
            .then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
