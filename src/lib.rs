//! Stackform - declarative resource reconciliation for an on-premises cloud stack.
//!
//! A library for creating, refreshing, updating and deleting control-plane
//! resources from declared attributes, and for listing them through data sources.

pub mod api;
pub mod backoff;
pub mod config;
pub mod data_sources;
pub mod datasource;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod resource;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod tags;
pub mod testing;
pub mod validation;

pub use api::{ApiClient, ApiError, Invoker};
pub use error::ReconcileError;
pub use reconciler::Reconciler;
pub use resource::{DeclaredResource, ResourceId, ResourceState};
