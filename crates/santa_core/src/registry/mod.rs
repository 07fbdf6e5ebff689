//! Stable capability tokens for roster members.
//!
//! # Responsibility
//! - Issue one token per participant name, lazily, and keep it forever.
//! - Resolve a presented token back to its roster entry.
//!
//! # Invariants
//! - `ensure_token(name)` returns the same token on every call, across
//!   processes, once issued.
//! - Distinct names never share a token.
//! - Only roster members can be issued or resolve a token.

use crate::model::participant::{Participant, ParticipantSeed};
use crate::model::token::Token;
use crate::repo::{RepoError, TokenRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum RegistryError {
    UnknownParticipant(String),
    Repo(RepoError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownParticipant(name) => write!(f, "`{name}` is not on the roster"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownParticipant(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Roster plus the token persistence backing it.
pub struct TokenRegistry<T: TokenRepository + ?Sized> {
    repo: Arc<T>,
    roster: Vec<ParticipantSeed>,
}

impl<T: TokenRepository + ?Sized> TokenRegistry<T> {
    /// `roster` is expected to be validated already; see
    /// [`crate::model::participant::validate_roster`].
    pub fn new(repo: Arc<T>, roster: Vec<ParticipantSeed>) -> Self {
        Self { repo, roster }
    }

    pub fn roster(&self) -> &[ParticipantSeed] {
        &self.roster
    }

    /// Returns the token for `name`, issuing and persisting one on first use.
    pub fn ensure_token(&self, name: &str) -> RegistryResult<Token> {
        let seed = self
            .seed(name)
            .ok_or_else(|| RegistryError::UnknownParticipant(name.to_string()))?;
        Ok(self.ensure_seed_token(seed)?)
    }

    /// Looks up the roster entry owning `token`.
    ///
    /// Tokens whose owner has left the roster resolve to `None`.
    pub fn resolve(&self, token: &Token) -> RegistryResult<Option<Participant>> {
        let Some(name) = self.repo.find_name(token)? else {
            return Ok(None);
        };
        Ok(self
            .seed(&name)
            .map(|seed| Participant::from_seed(seed, token.clone())))
    }

    /// Returns every roster member with its token, in roster order.
    pub fn participants(&self) -> RegistryResult<Vec<Participant>> {
        self.roster
            .iter()
            .map(|seed| -> RegistryResult<Participant> {
                let token = self.ensure_seed_token(seed)?;
                Ok(Participant::from_seed(seed, token))
            })
            .collect()
    }

    /// Returns the roster entry for `name`, if any.
    pub fn seed(&self, name: &str) -> Option<&ParticipantSeed> {
        self.roster.iter().find(|seed| seed.name == name)
    }

    fn ensure_seed_token(&self, seed: &ParticipantSeed) -> Result<Token, RepoError> {
        if let Some(token) = self.repo.get_token(&seed.name)? {
            return Ok(token);
        }

        let issued = self
            .repo
            .insert_token_if_absent(&seed.name, &Token::generate())?;
        info!("event=token_issue module=registry status=ok");
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::{RegistryError, TokenRegistry};
    use crate::model::participant::ParticipantSeed;
    use crate::model::token::Token;
    use crate::repo::SqliteStore;
    use std::sync::Arc;

    fn registry(names: &[&str]) -> TokenRegistry<SqliteStore> {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let roster = names.iter().map(|name| ParticipantSeed::new(*name)).collect();
        TokenRegistry::new(store, roster)
    }

    #[test]
    fn ensure_token_is_stable_per_name() {
        let registry = registry(&["Alice", "Bob"]);
        let first = registry.ensure_token("Alice").unwrap();
        let second = registry.ensure_token("Alice").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_names_get_distinct_tokens() {
        let registry = registry(&["Alice", "Bob"]);
        assert_ne!(
            registry.ensure_token("Alice").unwrap(),
            registry.ensure_token("Bob").unwrap()
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let registry = registry(&["Alice", "Bob"]);
        let err = registry.ensure_token("Mallory").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownParticipant(name) if name == "Mallory"));
    }

    #[test]
    fn resolve_round_trips_and_misses_unknown_tokens() {
        let registry = registry(&["Alice", "Bob"]);
        let token = registry.ensure_token("Bob").unwrap();

        let bob = registry.resolve(&token).unwrap().unwrap();
        assert_eq!(bob.name, "Bob");
        assert_eq!(bob.token, token);

        assert!(registry.resolve(&Token::generate()).unwrap().is_none());
    }

    #[test]
    fn participants_follow_roster_order_and_reuse_tokens() {
        let registry = registry(&["Carol", "Alice", "Bob"]);
        let alice = registry.ensure_token("Alice").unwrap();

        let participants = registry.participants().unwrap();
        let names: Vec<_> = participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Carol", "Alice", "Bob"]);
        assert_eq!(participants[1].token, alice);
    }
}
