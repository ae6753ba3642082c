//! Templeport - intranet portal backend for temple administrative records
//!
//! This crate provides the organization-chart import pipeline (spreadsheet
//! reader plus tree assembler), the department-scoped regulation repository,
//! and username/password authentication with user/admin roles.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod org;
pub mod routes;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
