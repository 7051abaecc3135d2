use std::fmt;

use serde::{Deserialize, Serialize};

const PERSON_DIGITS: usize = 11;
const ORGANIZATION_DIGITS: usize = 14;

/// Tax identifier families accepted by the checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// 11-digit individual identifier.
    #[serde(rename = "CPF")]
    Person,
    /// 14-digit corporate identifier.
    #[serde(rename = "CNPJ")]
    Organization,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::Person => "CPF",
            DocumentKind::Organization => "CNPJ",
        }
    }

    /// Parses the wire label used by list filters (`cpf`, `CNPJ`, ...).
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CPF" => Some(DocumentKind::Person),
            "CNPJ" => Some(DocumentKind::Organization),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified identifier holding only its digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub kind: DocumentKind,
    pub clean: String,
}

impl Document {
    /// `"CNPJ 11222333000181"` style label used when no registry name exists.
    pub fn placeholder_name(&self) -> String {
        format!("{} {}", self.kind.label(), self.clean)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.clean)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid document: expected 11 (CPF) or 14 (CNPJ) digits, found {digits}")]
    InvalidDocument { digits: usize },
}

/// Removes every non-digit character.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Strips punctuation and classifies the identifier by digit count.
pub fn classify(raw: &str) -> Result<Document, DocumentError> {
    let clean = digits_only(raw);
    let kind = match clean.len() {
        PERSON_DIGITS => DocumentKind::Person,
        ORGANIZATION_DIGITS => DocumentKind::Organization,
        digits => return Err(DocumentError::InvalidDocument { digits }),
    };

    Ok(Document { kind, clean })
}
