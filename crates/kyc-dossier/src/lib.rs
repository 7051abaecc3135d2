//! Registry aggregation, dossier workflow, and watchlist monitoring for Brazilian tax identifiers.

pub mod auth;
pub mod config;
pub mod document;
pub mod error;
pub mod narrative;
pub mod registry;
pub mod risk;
pub mod store;
pub mod telemetry;
pub mod workflows;
