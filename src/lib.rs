//! Lead Scoring API Library
//!
//! Scores sales leads and drafts outreach for the promising ones by
//! delegating the reasoning to an external language model, then returns the
//! structured results over HTTP.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `batch`: Batch driver with per-lead isolation.
//! - `circuit_breaker`: Per-batch upstream circuit breaker.
//! - `config`: Configuration management.
//! - `context`: Company context document loaded at startup.
//! - `credential`: Per-request model credential.
//! - `errors`: Error handling types.
//! - `extraction`: Structured extraction of model output.
//! - `generator`: Outreach message generation.
//! - `geo`: Location tiers and score multipliers.
//! - `handlers`: HTTP request handlers and router.
//! - `llm_client`: Language model client (Gemini).
//! - `models`: Core data models.
//! - `prompts`: Prompt construction.
//! - `scorer`: Lead scoring.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and the binary
pub mod batch;
pub mod circuit_breaker;
pub mod config;
pub mod context;
pub mod credential;
pub mod errors;
pub mod extraction;
pub mod generator;
pub mod geo;
pub mod handlers;
pub mod llm_client;
pub mod models;
pub mod prompts;
pub mod scorer;

#[cfg(test)]
mod test_support;
