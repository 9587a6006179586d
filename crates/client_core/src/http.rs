//! `reqwest` transport for the customers API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{error::ApiError, protocol::CreateCustomerRequest};
use tracing::debug;
use url::Url;

use crate::{CollectionFetcher, CustomerCreator};

pub const NETWORK_ERROR_CODE: &str = "network";
pub const DECODE_ERROR_CODE: &str = "decode";
pub const INVALID_URL_ERROR_CODE: &str = "invalid_url";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const CREATE_FAILED_MESSAGE: &str = "Failed to create customer";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpCustomerApi {
    http: Client,
    base_url: Url,
}

impl HttpCustomerApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::new(NETWORK_ERROR_CODE, err.to_string()))?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url).map_err(|err| {
            ApiError::new(
                INVALID_URL_ERROR_CODE,
                format!("invalid api url '{base_url}': {err}"),
            )
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    /// Resolves an endpoint path such as `/api/customers` below the base url,
    /// keeping any path prefix the base url carries.
    pub fn endpoint(&self, key: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(key.trim_start_matches('/'))
            .map_err(|err| {
                ApiError::new(
                    INVALID_URL_ERROR_CODE,
                    format!("invalid endpoint '{key}': {err}"),
                )
            })
    }
}

#[async_trait]
impl<T> CollectionFetcher<T> for HttpCustomerApi
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, key: &str) -> Result<Vec<T>, ApiError> {
        let url = self.endpoint(key)?;
        debug!(%url, "GET collection");
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(error_from_body(
                status,
                &body,
                &format!("request failed with status {status}"),
            ));
        }

        let body = response.bytes().await.map_err(transport_error)?;

        serde_json::from_slice(&body).map_err(|err| {
            ApiError::new(
                DECODE_ERROR_CODE,
                format!("failed to decode collection response: {err}"),
            )
        })
    }
}

#[async_trait]
impl CustomerCreator for HttpCustomerApi {
    async fn create(&self, key: &str, request: &CreateCustomerRequest) -> Result<(), ApiError> {
        let url = self.endpoint(key)?;
        debug!(%url, "POST customer");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.bytes().await.unwrap_or_default();
        Err(error_from_body(status, &body, CREATE_FAILED_MESSAGE))
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::new(NETWORK_ERROR_CODE, err.to_string())
}

/// Builds the error for a non-2xx response.
///
/// A body carrying `message` is used as-is; `code` may be a string or a
/// number and defaults to the status code. Anything else yields `fallback`.
pub(crate) fn error_from_body(status: StatusCode, body: &[u8], fallback: &str) -> ApiError {
    let status_code = status.as_u16().to_string();
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            code,
            message: Some(message),
        }) => {
            let code = match code {
                Some(serde_json::Value::String(code)) => code,
                Some(serde_json::Value::Number(code)) => code.to_string(),
                _ => status_code,
            };
            ApiError::new(code, message)
        }
        _ => ApiError::new(status_code, fallback),
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
