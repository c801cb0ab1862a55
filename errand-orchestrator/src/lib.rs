//! Errand Orchestrator
//!
//! HTTP service that accepts prompts, runs each one through an external
//! engine in the background and serves the files the engine produced.
//!
//! Architecture:
//! - API: axum handlers translating HTTP to service calls
//! - Services: validation, job lifecycle and artifact resolution
//! - Repository: the job registry behind the `JobRepository` trait
//! - Scheduler: bounded background execution of submitted jobs
//! - Engine: the boundary to the external agent process

pub mod api;
pub mod config;
pub mod engine;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod workspace;
