//! Watchlist of identifiers re-checked on demand, with change detection between checks.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    compute_status, AddOutcome, CountByType, MonitoringEntry, MonitoringSnapshot, MonitoringStats,
    MonitoringStatus, MonitoringView, UpdateAllReport, UpdateOutcome,
};
pub use repository::MonitoringRepository;
pub use router::monitoring_router;
pub use service::{MonitoringService, MonitoringServiceError, DEFAULT_CHANGE_WINDOW_DAYS};
