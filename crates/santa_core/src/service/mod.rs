//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate registry, draw and store calls into use-case level APIs.
//! - Keep HTTP and CLI layers decoupled from storage details.

pub mod draw_service;
