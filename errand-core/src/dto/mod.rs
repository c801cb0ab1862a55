//! Data Transfer Objects for the HTTP API
//!
//! Request and response bodies that are not domain entities themselves.

pub mod job;
pub mod service;
