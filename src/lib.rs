//! # claimq
//!
//! Work queue over a shared document collection. Pollers fetch items in a
//! ready status and win each one with a single conditional update, so any
//! number of processes can poll the same collection without handing an item
//! to two of them.
//!
//! Postgres is the production store ([`db`]); [`store::MemoryStore`] runs the
//! same protocol in-process.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handler;
pub mod model;
pub mod store;
pub mod telemetry;
