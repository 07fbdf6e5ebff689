//! Whole-group assignment construction.
//!
//! # Responsibility
//! - Turn one derangement into the full giver → receiver set for a roster.
//!
//! # Invariants
//! - Groups smaller than two are rejected before any shuffle runs.
//! - Exactly one derangement is drawn per call; pairs are never built
//!   one giver at a time.
//! - Output order follows input order: record `i` has giver `participants[i]`.

use crate::draw::derangement::{derangement, DerangementError, RandomSource};
use crate::model::assignment::Assignment;
use crate::model::participant::Participant;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Smallest group that admits a derangement.
pub const MIN_GROUP_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    TooFewParticipants { count: usize },
    Derangement(DerangementError),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewParticipants { count } => write!(
                f,
                "a draw needs at least {MIN_GROUP_SIZE} participants, got {count}"
            ),
            Self::Derangement(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TooFewParticipants { .. } => None,
            Self::Derangement(err) => Some(err),
        }
    }
}

impl From<DerangementError> for BuildError {
    fn from(value: DerangementError) -> Self {
        Self::Derangement(value)
    }
}

/// Builds the complete assignment set for `participants`.
pub fn build_assignments<S: RandomSource + ?Sized>(
    participants: &[Participant],
    source: &mut S,
) -> Result<Vec<Assignment>, BuildError> {
    if participants.len() < MIN_GROUP_SIZE {
        return Err(BuildError::TooFewParticipants {
            count: participants.len(),
        });
    }

    let perm = derangement(participants.len(), source)?;
    Ok(participants
        .iter()
        .zip(perm)
        .map(|(giver, target)| Assignment::pair(giver, &participants[target]))
        .collect())
}
