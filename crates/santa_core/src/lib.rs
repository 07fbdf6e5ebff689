//! Core domain logic for the gift draw.
//! This crate is the single source of truth for draw invariants.

pub mod db;
pub mod draw;
pub mod export;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use draw::{
    build_assignments, derangement, BuildError, DerangementError, RandomSource, RngSource,
    MAX_DERANGEMENT_ATTEMPTS,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::assignment::Assignment;
pub use model::participant::{
    default_roster, load_roster, parse_roster, validate_roster, Participant, ParticipantSeed,
    RosterError,
};
pub use model::token::Token;
pub use registry::{RegistryError, TokenRegistry};
pub use repo::{
    open_store, AssignmentRepository, DocumentStore, RepoError, RepoResult, SqliteStore, Store,
    StoreBackend, TokenRepository,
};
pub use service::draw_service::{
    Health, ParticipantView, Reveal, SantaService, ServiceError, ServiceResult,
};
