//! # Taskboard API Server Library
//!
//! HTTP surface of the Taskboard project and task manager.
//!
//! ## Modules
//!
//! - `app`: Application state and router
//! - `config`: Environment-driven configuration
//! - `error`: Error type and its failure envelope rendering
//! - `routes`: Request handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
