//! Shared test utilities for transdesk integration tests.
//!
//! This module provides:
//! - Builders for small OOXML documents
//! - Scripted fakes for the translation backend and the artifact store
//! - `TestDesk` wiring a desk over an in-memory store

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::TestDesk;
