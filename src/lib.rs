//! Credit Decision API Library
//!
//! Reads an applicant profile from the profile store, fills missing
//! attributes with defaults, forwards the application to the external
//! decision engine and maps its answer into a UI-facing result.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `decision_engine`: Decision engine HTTP client and response mapping.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Profile, request and result models.
//! - `orchestrator`: End-to-end credit analysis.
//! - `profile_store`: Profile lookup and store backends.

pub mod config;
pub mod decision_engine;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod profile_store;
