use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::mapping::{self, FieldTable, RegistryField};

/// Outcome of one upstream source inside an aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    NotQueried,
    Ok,
    Failed {
        error: String,
    },
}

impl SourceStatus {
    pub fn failed(error: impl fmt::Display) -> Self {
        SourceStatus::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SourceStatus::Ok)
    }

    pub fn was_queried(&self) -> bool {
        !matches!(self, SourceStatus::NotQueried)
    }
}

/// Registered address as reported by a company registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryAddress {
    pub street: String,
    pub number: String,
    pub complement: String,
    pub district: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
}

/// One line of the ownership roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Partner {
    pub name: String,
    pub role: String,
}

/// Canonical company record from the primary registry, or the secondary when the primary fails.
///
/// Blank strings mean the field was absent upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryRecord {
    pub legal_name: String,
    pub trade_name: String,
    pub registration_status: String,
    pub founding_date: String,
    pub size_class: String,
    pub legal_nature: String,
    pub address: RegistryAddress,
    pub phone: String,
    pub email: String,
    pub capital: f64,
    pub ownership_roster: Vec<Partner>,
}

impl RegistryRecord {
    /// Builds a record from a raw upstream payload using one source's candidate table.
    pub fn from_payload(payload: &Value, table: FieldTable) -> Self {
        let text = |field| mapping::first_text(payload, mapping::candidates(table, field));

        let ownership_roster = mapping::first_array(
            payload,
            mapping::candidates(table, RegistryField::OwnershipRoster),
        )
        .map(|entries| {
            entries
                .iter()
                .map(|entry| Partner {
                    name: mapping::first_text(entry, mapping::PARTNER_NAME),
                    role: mapping::first_text(entry, mapping::PARTNER_ROLE),
                })
                .filter(|partner| !partner.name.is_empty())
                .collect()
        })
        .unwrap_or_default();

        Self {
            legal_name: text(RegistryField::LegalName),
            trade_name: text(RegistryField::TradeName),
            registration_status: text(RegistryField::RegistrationStatus),
            founding_date: text(RegistryField::FoundingDate),
            size_class: text(RegistryField::SizeClass),
            legal_nature: text(RegistryField::LegalNature),
            address: RegistryAddress {
                street: text(RegistryField::Street),
                number: text(RegistryField::Number),
                complement: text(RegistryField::Complement),
                district: text(RegistryField::District),
                city: text(RegistryField::City),
                region: text(RegistryField::Region),
                postal_code: text(RegistryField::PostalCode),
            },
            phone: text(RegistryField::Phone),
            email: text(RegistryField::Email),
            capital: mapping::first_number(
                payload,
                mapping::candidates(table, RegistryField::Capital),
            )
            .unwrap_or_default(),
            ownership_roster,
        }
    }

    /// Targeted merge used when the primary registry omitted the founding date.
    pub fn enrich_identity(&mut self, other: &RegistryRecord) {
        fill(&mut self.founding_date, &other.founding_date);
        fill(&mut self.legal_name, &other.legal_name);
        fill(&mut self.trade_name, &other.trade_name);
        fill(&mut self.registration_status, &other.registration_status);
    }

    /// Legal name, then trade name; `None` when the registry named neither.
    pub fn display_name(&self) -> Option<&str> {
        [self.legal_name.as_str(), self.trade_name.as_str()]
            .into_iter()
            .find(|name| !name.trim().is_empty())
    }
}

fn fill(target: &mut String, candidate: &str) {
    if target.trim().is_empty() && !candidate.trim().is_empty() {
        *target = candidate.to_string();
    }
}

/// Provenance of the two company registries consulted for one lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySources {
    pub primary: SourceStatus,
    pub secondary: SourceStatus,
}

/// Result of a company registry lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationLookup {
    pub record: RegistryRecord,
    pub sources: RegistrySources,
}

/// Address returned by the postal-code directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressRecord {
    pub postal_code: String,
    pub street: String,
    pub complement: String,
    pub district: String,
    pub city: String,
    pub region: String,
    pub regional_code: String,
}

/// Entries retained from a single sanctions list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanctionList {
    pub status: SourceStatus,
    pub entries: Vec<Value>,
}

impl SanctionList {
    pub fn found(entries: Vec<Value>) -> Self {
        Self {
            status: SourceStatus::Ok,
            entries,
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            status: SourceStatus::failed(error),
            entries: Vec::new(),
        }
    }

    pub fn not_queried() -> Self {
        Self::default()
    }
}

/// Sanctions found across the three public lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanctionsRecord {
    /// Administrative debarment list (CEIS).
    pub debarment: SanctionList,
    /// Corporate penalty list (CNEP).
    pub corporate_penalty: SanctionList,
    /// Nonprofit impediment list (CEPIM).
    pub nonprofit_impediment: SanctionList,
}

impl SanctionsRecord {
    /// Record used when the whole lookup could not run.
    pub fn unavailable(error: impl fmt::Display) -> Self {
        let error = error.to_string();
        Self {
            debarment: SanctionList::failed(&error),
            corporate_penalty: SanctionList::failed(&error),
            nonprofit_impediment: SanctionList::failed(&error),
        }
    }

    pub fn total(&self) -> usize {
        self.debarment.entries.len()
            + self.corporate_penalty.entries.len()
            + self.nonprofit_impediment.entries.len()
    }

    pub fn lists(&self) -> [(&'static str, &SanctionList); 3] {
        [
            ("debarment", &self.debarment),
            ("corporate_penalty", &self.corporate_penalty),
            ("nonprofit_impediment", &self.nonprofit_impediment),
        ]
    }
}
