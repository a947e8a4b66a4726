//! Session backend for the campus item-sharing service.
//!
//! Login issues a refresh-token family; refresh rotates within it and
//! revokes the whole family when a dead token is replayed.

pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod tokens;
pub mod users;
pub mod validators;
