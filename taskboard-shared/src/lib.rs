//! # Taskboard Shared Library
//!
//! Domain core of the Taskboard project/task manager, used by the API server.
//!
//! ## Module Organization
//!
//! - `models`: Entity types, inputs, filters and their SQL
//! - `store`: Entity store interface with PostgreSQL and in-memory backends
//! - `auth`: Password hashing, tokens, request authentication and the ownership guard
//! - `lifecycle`: Task status rules (completion timestamp, deadlines, column ordering)
//! - `stats`: Project and task aggregation shapes and the overdue predicate
//! - `services`: Use cases returning the response envelope
//! - `envelope`: The `{success, data, message, pagination, errors}` contract
//! - `error`: Core error taxonomy
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod envelope;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod stats;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
