//! Domain model for the gift draw.
//!
//! # Responsibility
//! - Define roster, token and assignment records shared by every layer.
//!
//! # Invariants
//! - Participants are keyed by name; tokens are their only external handle.
//! - Assignment sets are produced whole, never one pair at a time.

pub mod assignment;
pub mod participant;
pub mod token;
