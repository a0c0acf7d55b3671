//! Tierbot server library
//!
//! Exposes the server components so integration tests can assemble them
//! with test doubles.

pub mod auth;
pub mod bootstrap;
pub mod clients;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod store;
pub mod subscription;
