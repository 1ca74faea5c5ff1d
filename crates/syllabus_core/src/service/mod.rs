//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI and embedding layers decoupled from storage details.

pub mod assembly_service;
pub mod course_service;
pub mod submission_service;
