//! Candidate-field tables translating upstream registry payloads into [`RegistryRecord`] fields.
//!
//! Each canonical field lists the upstream keys to try in order; the first key holding a
//! non-blank value wins.
//!
//! [`RegistryRecord`]: super::RegistryRecord

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryField {
    LegalName,
    TradeName,
    RegistrationStatus,
    FoundingDate,
    SizeClass,
    LegalNature,
    Street,
    Number,
    Complement,
    District,
    City,
    Region,
    PostalCode,
    Phone,
    Email,
    Capital,
    OwnershipRoster,
}

pub type FieldTable = &'static [(RegistryField, &'static [&'static str])];

/// Primary registry (BrasilAPI-shaped payloads, with camelCase variants seen in the wild).
pub const PRIMARY_FIELDS: FieldTable = &[
    (
        RegistryField::LegalName,
        &[
            "razao_social",
            "razaoSocial",
            "nome_empresarial",
            "nomeEmpresarial",
            "nome",
        ],
    ),
    (
        RegistryField::TradeName,
        &["nome_fantasia", "nomeFantasia", "fantasia"],
    ),
    (
        RegistryField::RegistrationStatus,
        &[
            "descricao_situacao_cadastral",
            "situacao_cadastral",
            "situacao",
        ],
    ),
    (
        RegistryField::FoundingDate,
        &["data_inicio_atividade", "data_abertura", "abertura"],
    ),
    (RegistryField::SizeClass, &["porte", "descricao_porte"]),
    (RegistryField::LegalNature, &["natureza_juridica"]),
    (RegistryField::Street, &["logradouro"]),
    (RegistryField::Number, &["numero"]),
    (RegistryField::Complement, &["complemento"]),
    (RegistryField::District, &["bairro"]),
    (RegistryField::City, &["municipio", "cidade"]),
    (RegistryField::Region, &["uf"]),
    (RegistryField::PostalCode, &["cep"]),
    (RegistryField::Phone, &["ddd_telefone_1", "telefone"]),
    (RegistryField::Email, &["email"]),
    (RegistryField::Capital, &["capital_social"]),
    (RegistryField::OwnershipRoster, &["qsa"]),
];

/// Secondary registry (ReceitaWS-shaped payloads).
pub const SECONDARY_FIELDS: FieldTable = &[
    (
        RegistryField::LegalName,
        &["nome", "razao_social", "nome_empresarial"],
    ),
    (RegistryField::TradeName, &["fantasia", "nome_fantasia"]),
    (
        RegistryField::RegistrationStatus,
        &["situacao", "situacao_cadastral"],
    ),
    (
        RegistryField::FoundingDate,
        &["abertura", "data_abertura", "data_inicio_atividade"],
    ),
    (RegistryField::SizeClass, &["porte"]),
    (RegistryField::LegalNature, &["natureza_juridica"]),
    (RegistryField::Street, &["logradouro"]),
    (RegistryField::Number, &["numero"]),
    (RegistryField::Complement, &["complemento"]),
    (RegistryField::District, &["bairro"]),
    (RegistryField::City, &["municipio", "cidade"]),
    (RegistryField::Region, &["uf"]),
    (RegistryField::PostalCode, &["cep"]),
    (RegistryField::Phone, &["telefone"]),
    (RegistryField::Email, &["email"]),
    (RegistryField::Capital, &["capital_social"]),
    (RegistryField::OwnershipRoster, &["qsa"]),
];

pub const PARTNER_NAME: &[&str] = &["nome_socio", "nome"];
pub const PARTNER_ROLE: &[&str] = &["qualificacao_socio", "qual"];

pub fn candidates(table: FieldTable, field: RegistryField) -> &'static [&'static str] {
    table
        .iter()
        .find(|(candidate, _)| *candidate == field)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

/// First non-blank scalar among `keys`, rendered as text; empty when none is present.
pub fn first_text(payload: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(scalar_text)
        .unwrap_or_default()
}

/// First numeric value among `keys`, accepting numbers and numeric strings.
pub fn first_number(payload: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        })
}

pub fn first_array<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| value.as_array().filter(|items| !items.is_empty()))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
