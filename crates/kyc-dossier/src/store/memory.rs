//! In-process repositories used when no external store is configured.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Page, PageRequest, RepositoryError};
use crate::document::DocumentKind;
use crate::workflows::dossier::{Decision, Dossier, DossierId, DossierRepository};
use crate::workflows::monitoring::{MonitoringEntry, MonitoringRepository};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

#[derive(Debug, Default, Clone)]
pub struct MemoryDossierRepository {
    records: Arc<Mutex<HashMap<DossierId, Dossier>>>,
}

impl MemoryDossierRepository {
    fn tenant_records(
        records: &HashMap<DossierId, Dossier>,
        tenant_id: &str,
    ) -> Vec<Dossier> {
        let mut items: Vec<Dossier> = records
            .values()
            .filter(|dossier| dossier.tenant_id == tenant_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}

#[async_trait]
impl DossierRepository for MemoryDossierRepository {
    async fn insert(&self, dossier: Dossier) -> Result<Dossier, RepositoryError> {
        let mut records = lock(&self.records)?;
        if records.contains_key(&dossier.id) {
            return Err(RepositoryError::Conflict);
        }
        records.insert(dossier.id, dossier.clone());
        Ok(dossier)
    }

    async fn fetch(
        &self,
        tenant_id: &str,
        id: &DossierId,
    ) -> Result<Option<Dossier>, RepositoryError> {
        let records = lock(&self.records)?;
        Ok(records
            .get(id)
            .filter(|dossier| dossier.tenant_id == tenant_id)
            .cloned())
    }

    async fn list(&self, tenant_id: &str, page: PageRequest) -> Result<Page<Dossier>, RepositoryError> {
        let records = lock(&self.records)?;
        let items = Self::tenant_records(&records, tenant_id);
        Ok(Page::new(page.slice(&items), items.len(), page))
    }

    async fn find_by_document(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<DossierId>, RepositoryError> {
        let records = lock(&self.records)?;
        Ok(Self::tenant_records(&records, tenant_id)
            .into_iter()
            .find(|dossier| dossier.document == document)
            .map(|dossier| dossier.id))
    }

    async fn record_decision(
        &self,
        tenant_id: &str,
        id: &DossierId,
        decision: Decision,
    ) -> Result<Dossier, RepositoryError> {
        let mut records = lock(&self.records)?;
        let dossier = records
            .get_mut(id)
            .filter(|dossier| dossier.tenant_id == tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        dossier.apply_decision(&decision);
        Ok(dossier.clone())
    }
}

type EntryKey = (String, String);

#[derive(Debug, Default, Clone)]
pub struct MemoryMonitoringRepository {
    entries: Arc<Mutex<HashMap<EntryKey, MonitoringEntry>>>,
}

impl MemoryMonitoringRepository {
    fn key(tenant_id: &str, document: &str) -> EntryKey {
        (tenant_id.to_string(), document.to_string())
    }

    fn tenant_entries(
        entries: &HashMap<EntryKey, MonitoringEntry>,
        tenant_id: &str,
        kind: Option<DocumentKind>,
    ) -> Vec<MonitoringEntry> {
        let mut items: Vec<MonitoringEntry> = entries
            .values()
            .filter(|entry| entry.tenant_id == tenant_id)
            .filter(|entry| kind.map_or(true, |kind| entry.kind == kind))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}

#[async_trait]
impl MonitoringRepository for MemoryMonitoringRepository {
    async fn find(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<MonitoringEntry>, RepositoryError> {
        let entries = lock(&self.entries)?;
        Ok(entries.get(&Self::key(tenant_id, document)).cloned())
    }

    async fn insert(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError> {
        let mut entries = lock(&self.entries)?;
        let key = Self::key(&entry.tenant_id, &entry.document);
        if entries.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        entries.insert(key, entry.clone());
        Ok(entry)
    }

    async fn update(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError> {
        let mut entries = lock(&self.entries)?;
        let stored = entries
            .get_mut(&Self::key(&entry.tenant_id, &entry.document))
            .ok_or(RepositoryError::NotFound)?;
        *stored = entry.clone();
        Ok(entry)
    }

    async fn delete(&self, tenant_id: &str, document: &str) -> Result<bool, RepositoryError> {
        let mut entries = lock(&self.entries)?;
        Ok(entries.remove(&Self::key(tenant_id, document)).is_some())
    }

    async fn list(
        &self,
        tenant_id: &str,
        kind: Option<DocumentKind>,
        page: PageRequest,
    ) -> Result<Page<MonitoringEntry>, RepositoryError> {
        let entries = lock(&self.entries)?;
        let items = Self::tenant_entries(&entries, tenant_id, kind);
        Ok(Page::new(page.slice(&items), items.len(), page))
    }

    async fn all(&self, tenant_id: &str) -> Result<Vec<MonitoringEntry>, RepositoryError> {
        let entries = lock(&self.entries)?;
        Ok(Self::tenant_entries(&entries, tenant_id, None))
    }
}
