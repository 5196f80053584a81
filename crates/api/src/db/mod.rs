//! Database schema, migrations, and query builders.
//!
//! Every builder returns a [`Built`] pair of SQLite SQL and bound values; the
//! server executes them against its connection.

pub mod ious;
pub mod items;
pub mod migrations;
pub mod requests;
pub mod tables;
pub mod tokens;
pub mod users;

// Re-export tables for convenience
pub use tables::*;

/// SQL text plus its positional parameters.
pub type Built = (String, sea_query::Values);
