use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;

use super::types::{ErrorEnvelope, Payload, RpcRequest};
use super::{ApiError, Invoker};
use crate::config::ClientConfig;

/// HTTP implementation of [`Invoker`] for the RPC-style control-plane gateway.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| ApiError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Request parameters plus the scoping every call carries. The scoping
    /// keys win over anything the caller put in `request.params`.
    pub fn form_params(&self, request: &RpcRequest) -> BTreeMap<String, String> {
        let mut params = request.params.clone();
        let common = [
            ("Action", request.action.as_str()),
            ("Version", request.product.version),
            ("Product", request.product.code),
            ("RegionId", self.config.region_id.as_str()),
            ("OrganizationId", self.config.department.as_str()),
            ("AccessKeyId", self.config.credentials.access_key_id()),
            ("Format", "JSON"),
        ];
        for (key, value) in common {
            params.insert(key.to_string(), value.to_string());
        }
        params
    }

    /// One POST bounded by `timeout`. A spent (zero) budget fails at once
    /// with [`ApiError::Timeout`] and sends nothing.
    pub async fn call(&self, request: &RpcRequest, timeout: Duration) -> Result<Payload, ApiError> {
        let action = request.action.as_str();
        if timeout.is_zero() {
            return Err(ApiError::Timeout {
                action: action.to_string(),
                timeout,
            });
        }
        let url = self.config.endpoint_for(request.product.code);
        let body = encode_form(&self.form_params(request));

        tracing::debug!(
            action,
            product = request.product.code,
            version = request.product.version,
            "invoking remote action"
        );

        let response = self
            .client
            .post(url)
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(action, timeout, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(action, timeout, e))?;

        let body: Value = if text.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                Err(e) if status.is_success() => {
                    return Err(ApiError::Decode {
                        action: action.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    let code = format!("HTTP{}", status.as_u16());
                    return Err(ApiError::Service {
                        action: action.to_string(),
                        status: status.as_u16(),
                        class: request.error_codes.classify(status.as_u16(), &code),
                        code,
                        message: truncate(&text, 256),
                        request_id: None,
                    });
                }
            }
        };

        let envelope: ErrorEnvelope = serde_json::from_value(body.clone()).unwrap_or_default();
        if !status.is_success() || envelope.reports_failure() {
            let code = envelope
                .code()
                .unwrap_or_else(|| format!("HTTP{}", status.as_u16()));
            let class = request.error_codes.classify(status.as_u16(), &code);
            tracing::debug!(action, %code, ?class, "remote action failed");
            return Err(ApiError::Service {
                action: action.to_string(),
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "Unknown error".to_string()),
                request_id: envelope.request_id,
                code,
                class,
            });
        }

        let payload = Payload::new(body);
        tracing::debug!(action, request_id = payload.request_id(), "remote action succeeded");
        Ok(payload)
    }
}

#[async_trait]
impl Invoker for ApiClient {
    async fn invoke(&self, request: &RpcRequest, timeout: Duration) -> Result<Payload, ApiError> {
        self.call(request, timeout).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.config.endpoint)
            .field("region_id", &self.config.region_id)
            .field("credentials", &"[REDACTED]")
            .finish()
    }
}

fn transport_error(action: &str, timeout: Duration, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout {
            action: action.to_string(),
            timeout,
        }
    } else {
        ApiError::Transport {
            action: action.to_string(),
            source: err,
        }
    }
}

fn encode_form(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
