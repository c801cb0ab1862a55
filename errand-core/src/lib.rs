//! Errand Core
//!
//! Core types shared by the Errand service, its HTTP client and the CLI.
//!
//! This crate contains:
//! - Domain types: the job record and its lifecycle state machine
//! - DTOs: request/response shapes exchanged over the HTTP API

pub mod domain;
pub mod dto;
