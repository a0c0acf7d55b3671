//! Unit tests module
//!
//! Components in isolation: no database, collaborators replaced by doubles.

mod completion_test;
mod delivery_test;
mod schedule_test;
