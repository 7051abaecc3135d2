//! Scripted registry fakes shared by the workflow test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{header, Request};
use axum::response::Response;
use axum::{body::Body, Extension, Router};
use serde_json::{json, Value};

use crate::auth::TokenVerifier;
use crate::document::Document;
use crate::narrative::{NarrativeError, NarrativeGenerator, NarrativeWriter};
use crate::registry::{
    AddressDirectory, AddressRecord, OrganizationLookup, OrganizationRegistry, RegistryError,
    RegistryRecord, RegistrySources, SanctionList, SanctionsRecord, SanctionsRegistry,
    SourceStatus,
};
use crate::risk::RiskAggregator;

pub(crate) const PERSON: &str = "529.982.247-25";
pub(crate) const PERSON_DIGITS: &str = "52998224725";
pub(crate) const COMPANY: &str = "11.222.333/0001-81";
pub(crate) const COMPANY_DIGITS: &str = "11222333000181";

/// Company registry answering from a fixed table; unknown identifiers are not found.
#[derive(Default)]
pub(crate) struct ScriptedRegistry {
    records: Mutex<HashMap<String, RegistryRecord>>,
    lookups: Mutex<Vec<String>>,
}

impl ScriptedRegistry {
    pub(crate) fn with_company(document: &str, legal_name: &str, status: &str) -> Self {
        let registry = Self::default();
        registry.set_company(document, legal_name, status);
        registry
    }

    pub(crate) fn set_company(&self, document: &str, legal_name: &str, status: &str) {
        let record = RegistryRecord {
            legal_name: legal_name.to_string(),
            registration_status: status.to_string(),
            ..RegistryRecord::default()
        };
        self.records
            .lock()
            .expect("registry mutex")
            .insert(document.to_string(), record);
    }

    pub(crate) fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("registry mutex").clone()
    }
}

#[async_trait]
impl OrganizationRegistry for ScriptedRegistry {
    async fn lookup(&self, cnpj: &str) -> Result<OrganizationLookup, RegistryError> {
        self.lookups
            .lock()
            .expect("registry mutex")
            .push(cnpj.to_string());
        let record = self.records.lock().expect("registry mutex").get(cnpj).cloned();
        match record {
            Some(record) => Ok(OrganizationLookup {
                record,
                sources: RegistrySources {
                    primary: SourceStatus::Ok,
                    secondary: SourceStatus::Ok,
                },
            }),
            None => Err(RegistryError::NotFound {
                provider: "company registries",
                detail: format!("{cnpj} not registered"),
            }),
        }
    }
}

pub(crate) struct NoAddresses;

#[async_trait]
impl AddressDirectory for NoAddresses {
    async fn lookup(&self, postal_code: &str) -> Result<AddressRecord, RegistryError> {
        Err(RegistryError::NotFound {
            provider: "postal directory",
            detail: format!("{postal_code} unknown"),
        })
    }
}

/// Sanctions lists whose hit counts can be changed between checks.
#[derive(Default)]
pub(crate) struct ScriptedSanctions {
    hits: Mutex<HashMap<String, usize>>,
    searches: Mutex<usize>,
}

impl ScriptedSanctions {
    pub(crate) fn set_hits(&self, document: &str, count: usize) {
        self.hits
            .lock()
            .expect("sanctions mutex")
            .insert(document.to_string(), count);
    }

    pub(crate) fn searches(&self) -> usize {
        *self.searches.lock().expect("sanctions mutex")
    }
}

#[async_trait]
impl SanctionsRegistry for ScriptedSanctions {
    async fn search(&self, document: &Document) -> Result<SanctionsRecord, RegistryError> {
        *self.searches.lock().expect("sanctions mutex") += 1;
        let count = self
            .hits
            .lock()
            .expect("sanctions mutex")
            .get(&document.clean)
            .copied()
            .unwrap_or_default();
        let entries = (0..count)
            .map(|index| json!({ "id": index, "cpfCnpjSancionado": document.clean }))
            .collect();
        Ok(SanctionsRecord {
            debarment: SanctionList::found(entries),
            corporate_penalty: SanctionList::found(Vec::new()),
            nonprofit_impediment: SanctionList::found(Vec::new()),
        })
    }
}

/// Narrative generator that records prompts and answers with a fixed line.
#[derive(Default)]
pub(crate) struct RecordingNarrative {
    prompts: Mutex<Vec<String>>,
}

impl RecordingNarrative {
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("narrative mutex").clone()
    }
}

#[async_trait]
impl NarrativeGenerator for RecordingNarrative {
    async fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        self.prompts
            .lock()
            .expect("narrative mutex")
            .push(prompt.to_string());
        Ok("Recommendation: Approve".to_string())
    }
}

/// Registry fakes behind one aggregator, kept reachable for assertions.
pub(crate) struct Upstreams {
    pub(crate) registry: Arc<ScriptedRegistry>,
    pub(crate) sanctions: Arc<ScriptedSanctions>,
    pub(crate) narrative: Arc<RecordingNarrative>,
}

impl Upstreams {
    pub(crate) fn new() -> Self {
        Self {
            registry: Arc::new(ScriptedRegistry::with_company(
                COMPANY_DIGITS,
                "ACME INDUSTRIA LTDA",
                "ATIVA",
            )),
            sanctions: Arc::new(ScriptedSanctions::default()),
            narrative: Arc::new(RecordingNarrative::default()),
        }
    }

    pub(crate) fn aggregator(&self) -> RiskAggregator {
        RiskAggregator::new(
            self.registry.clone(),
            Arc::new(NoAddresses),
            self.sanctions.clone(),
        )
    }

    pub(crate) fn narrative_writer(&self) -> NarrativeWriter {
        NarrativeWriter::new(self.narrative.clone())
    }
}

pub(crate) fn verifier() -> TokenVerifier {
    TokenVerifier::new(b"workflow-test-secret", jsonwebtoken::Algorithm::HS256, 30)
}

pub(crate) fn bearer(user_id: &str, tenant_id: &str) -> String {
    let token = verifier()
        .issue(user_id, tenant_id, None)
        .expect("token issued");
    format!("Bearer {token}")
}

/// Installs the token verifier the way the server does.
pub(crate) fn authenticated(router: Router) -> Router {
    router.layer(Extension(verifier()))
}

pub(crate) fn json_request(method: &str, uri: &str, tenant_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer("analyst-1", tenant_id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(crate) fn empty_request(method: &str, uri: &str, tenant_id: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer("analyst-1", tenant_id))
        .body(Body::empty())
        .expect("request builds")
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
