//! This module aggregates utility submodules used throughout the application.

/// Play history persistence in the application's SQLite database.
pub mod database;
