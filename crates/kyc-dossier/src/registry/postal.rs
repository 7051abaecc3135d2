use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::domain::AddressRecord;
use super::mapping::first_text;
use super::{AddressDirectory, RegistryError};
use crate::document::digits_only;

const PROVIDER: &str = "postal code directory";
const TIMEOUT: Duration = Duration::from_secs(10);

/// ViaCEP-style directory: `GET {base}/{digits}/json/`.
#[derive(Debug, Clone)]
pub struct PostalCodeClient {
    http: Client,
    base_url: String,
}

impl PostalCodeClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AddressDirectory for PostalCodeClient {
    async fn lookup(&self, postal_code: &str) -> Result<AddressRecord, RegistryError> {
        let digits = digits_only(postal_code);
        if digits.is_empty() {
            return Err(RegistryError::NotFound {
                provider: PROVIDER,
                detail: "postal code has no digits".to_string(),
            });
        }

        let url = format!("{}/{}/json/", self.base_url.trim_end_matches('/'), digits);
        let response = self
            .http
            .get(&url)
            .timeout(TIMEOUT)
            .send()
            .await
            .map_err(|err| RegistryError::transport(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Upstream {
                provider: PROVIDER,
                status: Some(status.as_u16()),
                detail: format!("status {}", status.as_u16()),
            });
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|err| RegistryError::Decode {
                provider: PROVIDER,
                detail: err.to_string(),
            })?;

        if payload.get("erro").is_some() {
            return Err(RegistryError::NotFound {
                provider: PROVIDER,
                detail: format!("postal code {digits} not found"),
            });
        }

        Ok(AddressRecord {
            postal_code: first_text(&payload, &["cep"]),
            street: first_text(&payload, &["logradouro"]),
            complement: first_text(&payload, &["complemento"]),
            district: first_text(&payload, &["bairro"]),
            city: first_text(&payload, &["localidade"]),
            region: first_text(&payload, &["uf"]),
            regional_code: first_text(&payload, &["ibge"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn maps_directory_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/01001000/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cep": "01001-000",
                "logradouro": "Praca da Se",
                "complemento": "lado impar",
                "bairro": "Se",
                "localidade": "Sao Paulo",
                "uf": "SP",
                "ibge": "3550308"
            })))
            .mount(&server)
            .await;

        let client = PostalCodeClient::new(Client::new(), format!("{}/ws", server.uri()));
        let address = client.lookup("01001-000").await.expect("address found");

        assert_eq!(address.city, "Sao Paulo");
        assert_eq!(address.regional_code, "3550308");
    }

    #[tokio::test]
    async fn error_sentinel_is_a_domain_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"erro": true})))
            .mount(&server)
            .await;

        let client = PostalCodeClient::new(Client::new(), server.uri());
        let err = client.lookup("99999999").await.expect_err("unknown postal code");
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn server_errors_are_upstream_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = PostalCodeClient::new(Client::new(), server.uri());
        let err = client.lookup("01001000").await.expect_err("bad gateway");
        assert_eq!(err.status(), Some(502));
    }
}
