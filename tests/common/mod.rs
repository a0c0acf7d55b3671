//! Common test utilities and helpers
//!
//! Shared by the unit and integration harnesses; not every helper is used by both.

#![allow(dead_code)]

pub mod doubles;

pub use db::TestDb;
pub use doubles::{completion, FailingStore, MockCompletion, MockPublisher, RecordingNotifier};
