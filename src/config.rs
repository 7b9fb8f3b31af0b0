//! Connection settings handed to the API client and per-operation timeouts.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::api::ApiError;

/// Terraform's default operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Access key pair used by the control-plane gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    access_key_secret: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"[REDACTED]")
            .finish()
    }
}

/// Everything the client attaches to every call: where to send it, which
/// region and department it is scoped to, and who is calling.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub region_id: String,
    pub department: String,
    pub credentials: Credentials,
    pub insecure: bool,
    product_endpoints: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        region_id: impl Into<String>,
        department: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region_id: region_id.into(),
            department: department.into(),
            credentials,
            insecure: false,
            product_endpoints: BTreeMap::new(),
        }
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Route one product to its own gateway (e.g. the Kafka open API endpoint).
    pub fn with_product_endpoint(
        mut self,
        product: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        self.product_endpoints.insert(product.into(), endpoint.into());
        self
    }

    pub fn endpoint_for(&self, product: &str) -> &str {
        self.product_endpoints
            .get(product)
            .map(String::as_str)
            .unwrap_or(&self.endpoint)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let endpoints =
            std::iter::once(&self.endpoint).chain(self.product_endpoints.values());
        for endpoint in endpoints {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ApiError::Config {
                    message: format!("endpoint '{}' must start with http:// or https://", endpoint),
                });
            }
        }
        if self.region_id.trim().is_empty() {
            return Err(ApiError::Config {
                message: "region id is required".to_string(),
            });
        }
        if self.credentials.access_key_id.trim().is_empty() {
            return Err(ApiError::Config {
                message: "access key is required".to_string(),
            });
        }
        if self.credentials.access_key_secret.trim().is_empty() {
            return Err(ApiError::Config {
                message: "access key secret is required".to_string(),
            });
        }
        Ok(())
    }
}

/// Timeout budgets per operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    pub fn with_create(mut self, timeout: Duration) -> Self {
        self.create = timeout;
        self
    }

    pub fn with_update(mut self, timeout: Duration) -> Self {
        self.update = timeout;
        self
    }

    pub fn with_delete(mut self, timeout: Duration) -> Self {
        self.delete = timeout;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}
