//! Remote operation invoker for the control-plane API.

mod client;
mod error;
mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{
    ErrorClass, ErrorCodes, ErrorEnvelope, Payload, Product, RpcRequest, lookup, scalar_to_string,
};

use std::time::Duration;

use async_trait::async_trait;

/// One network call per invocation. Implementations classify every failure
/// through [`ApiError::class`] and never retry internally.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: &RpcRequest, timeout: Duration) -> Result<Payload, ApiError>;
}
