//! Configuration modules, loaded from environment variables.
//!
//! - [`cors`]: allowed origins for the CORS layer
//! - [`database`]: PostgreSQL connection pool initialization
//! - [`jwt`]: bearer-token verification secret

pub mod cors;
pub mod database;
pub mod jwt;
