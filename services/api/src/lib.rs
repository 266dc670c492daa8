//! services/api/src/lib.rs
//!
//! The runnable side of the festival planner: adapters for the core ports,
//! configuration, the service error type and the REST + WebSocket web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
