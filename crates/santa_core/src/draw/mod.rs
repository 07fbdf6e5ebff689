//! Draw algorithm: derangement sampling and assignment construction.
//!
//! Pure apart from the injected [`RandomSource`]; no storage access here.

pub mod builder;
pub mod derangement;

pub use builder::{build_assignments, BuildError, MIN_GROUP_SIZE};
pub use derangement::{
    derangement, derangement_with_budget, is_derangement, DerangementError, RandomSource,
    RngSource, MAX_DERANGEMENT_ATTEMPTS,
};
