//! Test utilities and fixtures for Fallback
//!
//! This crate provides shared test helpers for the integration tests
//! (tests/ directory) and benches of the workspace crates.

pub mod fixtures;
pub mod mocks;

pub use mocks::{MockDiagnosticHandler, MockFetcher, Recorder};
