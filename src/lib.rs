//! letterarchive - school letter archive and approval backend.
//!
//! Archives inbound/outbound letters, generates numbered letters from
//! templates, and renders them into stored artifacts when approved. Stored
//! files live in one of two interchangeable storage backends; document
//! records and sequence counters live in SQLite or PostgreSQL.

pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod render;
pub mod repository;
pub mod schema;
pub mod sequence;
pub mod server;
pub mod services;
pub mod storage;

pub use error::{ErrorKind, LifecycleError};
pub use lifecycle::DocumentLifecycle;
