//! Draw use-case service.
//!
//! # Responsibility
//! - Reveal a participant's receiver, drawing the whole group on first use.
//! - Provide reset, health and export entry points for outer layers.
//!
//! # Invariants
//! - At most one draw runs per reset cycle: the check → draw → write
//!   sequence runs under `draw`, with the store re-read after the lock is
//!   taken, and the write itself only lands on an empty store, so other
//!   services on the same backend keep the first set.
//! - A reveal is answered from one snapshot of the stored set.
//! - A stored assignment is returned as-is, never recomputed.
//! - A stored set that does not cover the current roster is reported as
//!   `RosterChanged`; only a reset clears it.

use crate::draw::{build_assignments, BuildError, RandomSource, RngSource};
use crate::export;
use crate::model::assignment::Assignment;
use crate::model::participant::{Participant, ParticipantSeed};
use crate::model::token::Token;
use crate::registry::{RegistryError, TokenRegistry};
use crate::repo::{RepoError, Store};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Service error for draw use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Token is malformed or not issued to a roster member.
    InvalidToken,
    /// Name is not on the roster.
    UnknownParticipant(String),
    /// Group too small, or no derangement found within budget.
    Draw(BuildError),
    /// Stored assignments do not match the roster; a reset is required.
    RosterChanged,
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "unknown token"),
            Self::UnknownParticipant(name) => write!(f, "`{name}` is not on the roster"),
            Self::Draw(err) => write!(f, "{err}"),
            Self::RosterChanged => write!(
                f,
                "stored assignments do not match the roster; reset required"
            ),
            Self::Store(err) => write!(f, "store unavailable: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Draw(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<BuildError> for ServiceError {
    fn from(value: BuildError) -> Self {
        Self::Draw(value)
    }
}

impl From<RegistryError> for ServiceError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::UnknownParticipant(name) => Self::UnknownParticipant(name),
            RegistryError::Repo(err) => Self::Store(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Public view of a roster member; never carries the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantView {
    pub name: String,
    pub birthday: Option<String>,
    pub anniversary: Option<String>,
}

impl From<&ParticipantSeed> for ParticipantView {
    fn from(seed: &ParticipantSeed) -> Self {
        Self {
            name: seed.name.clone(),
            birthday: seed.birthday.clone(),
            anniversary: seed.anniversary.clone(),
        }
    }
}

impl From<&Participant> for ParticipantView {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name.clone(),
            birthday: participant.birthday.clone(),
            anniversary: participant.anniversary.clone(),
        }
    }
}

/// Result of a reveal: who the caller is and whom they give to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reveal {
    pub giver: ParticipantView,
    pub receiver: ParticipantView,
}

/// Backend reachability report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub backend: &'static str,
    pub reachable: bool,
}

type SharedSource = Box<dyn RandomSource + Send>;

/// Use-case service over a token/assignment store.
pub struct SantaService<S: Store + ?Sized> {
    store: Arc<S>,
    registry: TokenRegistry<S>,
    draw: Mutex<SharedSource>,
}

impl<S: Store + ?Sized> SantaService<S> {
    /// Creates a service drawing from an entropy-seeded generator.
    pub fn new(store: Arc<S>, roster: Vec<ParticipantSeed>) -> Self {
        Self::with_source(store, roster, Box::new(RngSource(StdRng::from_entropy())))
    }

    /// Creates a service with an injected random source.
    pub fn with_source(store: Arc<S>, roster: Vec<ParticipantSeed>, source: SharedSource) -> Self {
        Self {
            registry: TokenRegistry::new(Arc::clone(&store), roster),
            store,
            draw: Mutex::new(source),
        }
    }

    /// Returns the receiver for the participant holding `token`.
    ///
    /// The first reveal of a reset cycle draws and persists the whole group;
    /// every later reveal reads the stored set.
    pub fn reveal(&self, token: &str) -> ServiceResult<Reveal> {
        let token = Token::parse(token).ok_or(ServiceError::InvalidToken)?;
        let giver = self
            .registry
            .resolve(&token)?
            .ok_or(ServiceError::InvalidToken)?;

        let stored = self.store.list_assignments()?;
        if let Some(assignment) = find_giver(&stored, &token) {
            return self.to_reveal(&giver, assignment, &stored);
        }

        let stored = self.draw_once(&token)?;
        let assignment = find_giver(&stored, &token).ok_or(ServiceError::RosterChanged)?;
        self.to_reveal(&giver, assignment, &stored)
    }

    /// Returns the token for a roster name, issuing one if needed.
    pub fn ensure_token(&self, name: &str) -> ServiceResult<Token> {
        Ok(self.registry.ensure_token(name)?)
    }

    /// Returns every roster member with its token.
    pub fn participants(&self) -> ServiceResult<Vec<Participant>> {
        Ok(self.registry.participants()?)
    }

    pub fn assignments(&self) -> ServiceResult<Vec<Assignment>> {
        Ok(self.store.list_assignments()?)
    }

    /// Clears every stored assignment; tokens are kept.
    pub fn reset(&self) -> ServiceResult<()> {
        let _guard = self.draw.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.reset_assignments()?;
        warn!("event=assignments_reset module=service status=ok");
        Ok(())
    }

    /// Reports whether the store answers, without mutating it.
    pub fn health(&self) -> Health {
        let reachable = match self.store.ping() {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=health_check module=service status=error backend={} error={}",
                    self.store.backend_name(),
                    err
                );
                false
            }
        };
        Health {
            backend: self.store.backend_name(),
            reachable,
        }
    }

    /// Renders the stored assignment table as CSV.
    pub fn export_assignments_csv(&self, base_url: &str) -> ServiceResult<String> {
        let assignments = self.store.list_assignments()?;
        Ok(export::assignments_csv(
            &assignments,
            |name| self.registry.seed(name),
            base_url,
        ))
    }

    /// Renders one claim link per roster member as CSV.
    pub fn export_links_csv(&self, base_url: &str) -> ServiceResult<String> {
        let participants = self.registry.participants()?;
        Ok(export::links_csv(&participants, base_url))
    }

    /// Returns the assignment set in effect, drawing it if the store is empty.
    fn draw_once(&self, token: &Token) -> ServiceResult<Vec<Assignment>> {
        let mut source = self.draw.lock().unwrap_or_else(PoisonError::into_inner);

        // Another request may have drawn while this one waited for the lock.
        let stored = self.store.list_assignments()?;
        if !stored.is_empty() {
            if find_giver(&stored, token).is_none() {
                warn!("event=draw module=service status=error error_code=roster_changed");
            }
            return Ok(stored);
        }

        let started_at = Instant::now();
        let participants = self.registry.participants()?;
        let assignments = match build_assignments(&participants, &mut **source) {
            Ok(assignments) => assignments,
            Err(err) => {
                error!(
                    "event=draw module=service status=error group_size={} error={}",
                    participants.len(),
                    err
                );
                return Err(err.into());
            }
        };

        let stored = self.store.insert_assignments_if_empty(&assignments)?;
        if stored == assignments {
            info!(
                "event=draw module=service status=ok group_size={} duration_ms={}",
                assignments.len(),
                started_at.elapsed().as_millis()
            );
        } else {
            info!("event=draw module=service status=ok outcome=kept_existing");
        }
        Ok(stored)
    }

    fn to_reveal(
        &self,
        giver: &Participant,
        assignment: &Assignment,
        stored: &[Assignment],
    ) -> ServiceResult<Reveal> {
        let receiver = self
            .registry
            .seed(&assignment.receiver_name)
            .ok_or(ServiceError::RosterChanged)?;
        if !self.covers_roster(stored) {
            return Err(ServiceError::RosterChanged);
        }
        Ok(Reveal {
            giver: ParticipantView::from(giver),
            receiver: ParticipantView::from(receiver),
        })
    }

    /// Whether `stored` has exactly one giver per current roster name.
    fn covers_roster(&self, stored: &[Assignment]) -> bool {
        if stored.len() != self.registry.roster().len() {
            return false;
        }
        let givers: HashSet<&str> = stored
            .iter()
            .map(|assignment| assignment.giver_name.as_str())
            .collect();
        self.registry
            .roster()
            .iter()
            .all(|seed| givers.contains(seed.name.as_str()))
    }
}

fn find_giver<'a>(stored: &'a [Assignment], token: &Token) -> Option<&'a Assignment> {
    stored
        .iter()
        .find(|assignment| &assignment.giver_token == token)
}
