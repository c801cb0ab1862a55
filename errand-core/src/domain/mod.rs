//! Core domain types
//!
//! The job record is owned by the orchestrator's registry and mirrored by
//! the client and CLI when read back over HTTP.

pub mod job;
