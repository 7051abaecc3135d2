//! Adapters for the public registries consulted during a check.
//!
//! Each adapter is a trait so the aggregator can be exercised with scripted fakes; the HTTP
//! clients in the submodules are the production implementations.

pub mod domain;
pub mod mapping;
pub mod organization;
pub mod postal;
pub mod sanctions;

use async_trait::async_trait;

use crate::document::Document;

pub use domain::{
    AddressRecord, OrganizationLookup, Partner, RegistryAddress, RegistryRecord,
    RegistrySources, SanctionList, SanctionsRecord, SourceStatus,
};
pub use organization::{CompanyRegistryClient, RetryPolicy};
pub use postal::PostalCodeClient;
pub use sanctions::SanctionsClient;

/// Company registry lookup for 14-digit identifiers.
#[async_trait]
pub trait OrganizationRegistry: Send + Sync {
    async fn lookup(&self, cnpj: &str) -> Result<OrganizationLookup, RegistryError>;
}

/// Postal-code directory.
#[async_trait]
pub trait AddressDirectory: Send + Sync {
    async fn lookup(&self, postal_code: &str) -> Result<AddressRecord, RegistryError>;
}

/// Public sanctions lists.
#[async_trait]
pub trait SanctionsRegistry: Send + Sync {
    async fn search(&self, document: &Document) -> Result<SanctionsRecord, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{provider} unavailable: {detail}")]
    Upstream {
        provider: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("{provider}: {detail}")]
    NotFound {
        provider: &'static str,
        detail: String,
    },
    #[error("{provider} is not configured: {detail}")]
    NotConfigured {
        provider: &'static str,
        detail: &'static str,
    },
    #[error("{provider} returned an unreadable payload: {detail}")]
    Decode {
        provider: &'static str,
        detail: String,
    },
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

impl RegistryError {
    /// Last HTTP status observed upstream, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        RegistryError::Upstream {
            provider,
            status: err.status().map(|status| status.as_u16()),
            detail: err.to_string(),
        }
    }
}
