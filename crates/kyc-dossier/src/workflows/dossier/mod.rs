//! Dossier creation, retrieval, batch runs, and the approval decision.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    CompanySummary, Decision, DecisionStatus, DerivedSummary, Dossier, DossierId, DossierReport,
    DossierSummary, ReportInput, ReportMetadata, ReportSources, TechnicalReport,
};
pub use repository::DossierRepository;
pub use router::dossier_router;
pub use service::{
    BatchItem, BatchItemOutcome, BatchReport, CreateDossier, DecisionRequest, DossierService,
    DossierServiceError, DEFAULT_BATCH_DELAY,
};
