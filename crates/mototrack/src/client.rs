//! Remote data client for the fleet REST API.
//!
//! [`FleetApi`] is the seam the rest of the crate talks to; [`HttpFleetApi`]
//! is the `reqwest` implementation used in production.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::motorcycle::MotorcycleId;
use crate::wire::{BranchDto, MotoDto};

/// Longest raw body kept as an error message when it is not JSON.
const MAX_RAW_MESSAGE_LEN: usize = 200;

/// Operations offered by the fleet backend.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// `GET /api/motos`
    async fn list_motorcycles(&self) -> Result<Vec<MotoDto>>;

    /// `GET /api/motos/{id}`
    async fn get_motorcycle(&self, id: MotorcycleId) -> Result<MotoDto>;

    /// `POST /api/motos`
    async fn create_motorcycle(&self, dto: &MotoDto) -> Result<MotoDto>;

    /// `PUT /api/motos/{id}`
    async fn update_motorcycle(&self, id: MotorcycleId, dto: &MotoDto) -> Result<MotoDto>;

    /// `DELETE /api/motos/{id}`
    async fn delete_motorcycle(&self, id: MotorcycleId) -> Result<()>;

    /// `GET /api/filiais`
    async fn list_branches(&self) -> Result<Vec<BranchDto>>;

    /// `GET /api/filiais/{id}`
    async fn get_branch(&self, id: i64) -> Result<BranchDto>;

    /// `POST /api/filiais`
    async fn create_branch(&self, name: &str) -> Result<BranchDto>;

    /// `PUT /api/filiais/{id}`
    async fn update_branch(&self, id: i64, name: &str) -> Result<BranchDto>;

    /// `DELETE /api/filiais/{id}`
    async fn delete_branch(&self, id: i64) -> Result<()>;
}

/// HTTP client for the fleet backend.
#[derive(Debug, Clone)]
pub struct HttpFleetApi {
    client: Client,
    base_url: String,
}

impl HttpFleetApi {
    /// Build a client from the API configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + Sync + ?Sized,
    {
        debug!(%method, path, "API request");
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|err| {
            error!(%method, path, error = %err, "API request failed without response");
            Error::Network(err)
        })?;

        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "API response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        error!(
            %method,
            path,
            status = status.as_u16(),
            message = message.as_deref().unwrap_or(""),
            "API error response"
        );
        Err(Error::Http {
            method,
            path: path.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute::<()>(Method::GET, path, None).await?;
        decode(path, response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(method, path, Some(body)).await?;
        decode(path, response).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.execute::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }
}

/// Decode a successful response body.
///
/// A body that is not the expected JSON is reported as [`Error::Json`],
/// never as a network error.
async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| {
        error!(path, error = %err, "API response body could not be decoded");
        Error::Json(err)
    })
}

/// Pull a human-readable message out of an error body.
///
/// Looks for `message`, then `error` (string or `{ "message": .. }`), then
/// falls back to a short plain-text body.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let text = value
            .get("message")
            .and_then(serde_json::Value::as_str)
            .or_else(|| value.get("error").and_then(serde_json::Value::as_str))
            .or_else(|| {
                value
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(serde_json::Value::as_str)
            });
        return text.map(str::to_string);
    }
    (trimmed.len() <= MAX_RAW_MESSAGE_LEN).then(|| trimmed.to_string())
}

#[async_trait]
impl FleetApi for HttpFleetApi {
    async fn list_motorcycles(&self) -> Result<Vec<MotoDto>> {
        let records: Vec<serde_json::Value> = self.get_json("/api/motos").await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<MotoDto>(record) {
                Ok(dto) => Some(dto),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable motorcycle record");
                    None
                }
            })
            .collect())
    }

    async fn get_motorcycle(&self, id: MotorcycleId) -> Result<MotoDto> {
        self.get_json(&format!("/api/motos/{id}")).await
    }

    async fn create_motorcycle(&self, dto: &MotoDto) -> Result<MotoDto> {
        self.send_json(Method::POST, "/api/motos", dto).await
    }

    async fn update_motorcycle(&self, id: MotorcycleId, dto: &MotoDto) -> Result<MotoDto> {
        let payload = MotoDto {
            id: Some(id),
            ..dto.clone()
        };
        self.send_json(Method::PUT, &format!("/api/motos/{id}"), &payload)
            .await
    }

    async fn delete_motorcycle(&self, id: MotorcycleId) -> Result<()> {
        self.delete(&format!("/api/motos/{id}")).await
    }

    async fn list_branches(&self) -> Result<Vec<BranchDto>> {
        self.get_json("/api/filiais").await
    }

    async fn get_branch(&self, id: i64) -> Result<BranchDto> {
        self.get_json(&format!("/api/filiais/{id}")).await
    }

    async fn create_branch(&self, name: &str) -> Result<BranchDto> {
        let payload = BranchDto {
            id_filial_departamento: None,
            nome_filial_departamento: name.to_string(),
        };
        self.send_json(Method::POST, "/api/filiais", &payload).await
    }

    async fn update_branch(&self, id: i64, name: &str) -> Result<BranchDto> {
        let payload = BranchDto {
            id_filial_departamento: Some(id),
            nome_filial_departamento: name.to_string(),
        };
        self.send_json(Method::PUT, &format!("/api/filiais/{id}"), &payload)
            .await
    }

    async fn delete_branch(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/filiais/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_from_json() {
        assert_eq!(
            extract_message(r#"{"message":"Moto não encontrada"}"#),
            Some("Moto não encontrada".to_string())
        );
        assert_eq!(
            extract_message(r#"{"error":"Bad Request","status":400}"#),
            Some("Bad Request".to_string())
        );
        assert_eq!(
            extract_message(r#"{"error":{"code":400,"message":"EMAIL_EXISTS"}}"#),
            Some("EMAIL_EXISTS".to_string())
        );
    }

    #[test]
    fn test_extract_message_json_without_message() {
        assert_eq!(extract_message(r#"{"status":500}"#), None);
    }

    #[test]
    fn test_extract_message_plain_text() {
        assert_eq!(
            extract_message("  Service Unavailable \n"),
            Some("Service Unavailable".to_string())
        );
        assert_eq!(extract_message(""), None);
        assert_eq!(extract_message(&"x".repeat(500)), None);
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ApiConfig {
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 10,
        };
        let api = HttpFleetApi::new(&config).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8080");
        assert_eq!(api.url("/api/motos"), "http://localhost:8080/api/motos");
    }
}
