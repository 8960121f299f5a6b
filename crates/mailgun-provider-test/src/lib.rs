//! Integration test infrastructure for the Mailgun provider
//!
//! Provides:
//! - An in-memory Mailgun that records every call
//! - In-memory secret store and credential resolver
//! - A provider harness wired to all three
//! - Record fixtures for every kind
//! - Call log and secret verification helpers

mod doubles;
pub mod fake;
pub mod fixtures;
mod harness;
mod verification;

pub use doubles::{MemorySecretStore, StaticCredentialResolver};
pub use fake::{scope, Call, FakeMailgun};
pub use harness::ProviderHarness;
pub use verification::*;
