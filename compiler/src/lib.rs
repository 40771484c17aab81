//! Sieve: compiles declarative JSON filters into document-store queries and
//! parameterised SQL where-clauses.

pub mod adapters;
mod app;
pub mod core;
pub mod dates;
pub mod filter;
pub mod schema;
pub mod sql;
pub mod utils;
