use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// A control-plane product and the API version its actions are served under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub code: &'static str,
    pub version: &'static str,
}

impl Product {
    pub const fn new(code: &'static str, version: &'static str) -> Self {
        Self { code, version }
    }
}

/// How the caller should treat a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    NotFound,
    Fatal,
}

/// Error codes a resource kind adds on top of the shared classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCodes {
    pub retryable: Vec<&'static str>,
    pub not_found: Vec<&'static str>,
}

impl ErrorCodes {
    pub fn new(retryable: &[&'static str], not_found: &[&'static str]) -> Self {
        Self {
            retryable: retryable.to_vec(),
            not_found: not_found.to_vec(),
        }
    }

    pub fn classify(&self, status: u16, code: &str) -> ErrorClass {
        if self.retryable.contains(&code) {
            return ErrorClass::Retryable;
        }
        if self.not_found.contains(&code) || is_not_found(status, code) {
            return ErrorClass::NotFound;
        }
        if is_throttling(code) || status == 429 || status >= 500 {
            return ErrorClass::Retryable;
        }
        ErrorClass::Fatal
    }
}

fn is_not_found(status: u16, code: &str) -> bool {
    status == 404 || code.ends_with("NotFound") || code.starts_with("EntityNotExist")
}

fn is_throttling(code: &str) -> bool {
    code == "ServiceUnavailable" || code == "Rejected.Throttling" || code.starts_with("Throttling")
}

/// One action call against the control plane, before the client attaches
/// region, department, credentials and versioning.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub product: Product,
    pub action: String,
    pub params: BTreeMap<String, String>,
    pub error_codes: ErrorCodes,
}

impl RpcRequest {
    pub fn new(product: Product, action: impl Into<String>) -> Self {
        Self {
            product,
            action: action.into(),
            params: BTreeMap::new(),
            error_codes: ErrorCodes::default(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_error_codes(mut self, codes: ErrorCodes) -> Self {
        self.error_codes = codes;
        self
    }
}

/// Decoded response body of a successful action.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    body: Value,
}

impl Payload {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.body.get("RequestId").and_then(Value::as_str)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.body, path)
    }

    /// Scalar at `path` rendered as a string; numbers are accepted.
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(scalar_to_string)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Resolve a dot-separated path. Numeric segments index into arrays and an
/// empty path resolves to `value` itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Error envelope shared by the RPC and ASAPI gateways.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "Code", alias = "asapiErrorCode", alias = "code", default)]
    pub code: Option<Value>,
    #[serde(rename = "Message", alias = "asapiErrorMessage", alias = "message", default)]
    pub message: Option<String>,
    #[serde(rename = "RequestId", alias = "asapiRequestId", default)]
    pub request_id: Option<String>,
    #[serde(rename = "Success", alias = "asapiSuccess", alias = "success", default)]
    pub success: Option<bool>,
}

impl ErrorEnvelope {
    pub fn reports_failure(&self) -> bool {
        self.success == Some(false)
    }

    pub fn code(&self) -> Option<String> {
        self.code.as_ref().and_then(scalar_to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KAFKA: Product = Product::new("alikafka", "2019-09-16");

    #[test]
    fn test_classify_shared_throttling_codes() {
        let codes = ErrorCodes::default();
        assert_eq!(codes.classify(400, "Throttling.User"), ErrorClass::Retryable);
        assert_eq!(codes.classify(400, "Throttling"), ErrorClass::Retryable);
        assert_eq!(codes.classify(400, "Rejected.Throttling"), ErrorClass::Retryable);
        assert_eq!(codes.classify(503, "ServiceUnavailable"), ErrorClass::Retryable);
        assert_eq!(codes.classify(500, "InternalError"), ErrorClass::Retryable);
        assert_eq!(codes.classify(429, "TooMany"), ErrorClass::Retryable);
    }

    #[test]
    fn test_classify_not_found_shapes() {
        let codes = ErrorCodes::default();
        assert_eq!(codes.classify(404, "Whatever"), ErrorClass::NotFound);
        assert_eq!(codes.classify(400, "InvalidTopic.NotFound"), ErrorClass::NotFound);
        assert_eq!(codes.classify(400, "EntityNotExists.Template"), ErrorClass::NotFound);
    }

    #[test]
    fn test_classify_kind_specific_codes_take_precedence() {
        let codes = ErrorCodes::new(&["ONS_SYSTEM_FLOW_CONTROL"], &["InstanceNoEnoughNumber"]);
        assert_eq!(codes.classify(400, "ONS_SYSTEM_FLOW_CONTROL"), ErrorClass::Retryable);
        assert_eq!(codes.classify(400, "InstanceNoEnoughNumber"), ErrorClass::NotFound);
    }

    #[test]
    fn test_classify_everything_else_is_fatal() {
        let codes = ErrorCodes::default();
        assert_eq!(codes.classify(400, "InvalidParameter"), ErrorClass::Fatal);
        assert_eq!(codes.classify(403, "Forbidden.RAM"), ErrorClass::Fatal);
    }

    #[test]
    fn test_request_builder() {
        let request = RpcRequest::new(KAFKA, "CreateTopic")
            .with_param("Topic", "orders")
            .with_param("PartitionNum", "12");
        assert_eq!(request.action, "CreateTopic");
        assert_eq!(request.params["Topic"], "orders");
        assert_eq!(request.params.len(), 2);
    }

    #[test]
    fn test_lookup_nested_paths_and_indexes() {
        let body = json!({
            "Template": {"TemplateName": "deploy"},
            "Items": [{"Id": "a"}, {"Id": "b"}]
        });
        assert_eq!(lookup(&body, "Template.TemplateName"), Some(&json!("deploy")));
        assert_eq!(lookup(&body, "Items.1.Id"), Some(&json!("b")));
        assert_eq!(lookup(&body, "Items.9.Id"), None);
        assert_eq!(lookup(&body, "Missing.Path"), None);
        assert_eq!(lookup(&body, ""), Some(&body));
    }

    #[test]
    fn test_payload_string_accepts_numbers() {
        let payload = Payload::new(json!({"ContactId": 4021, "RequestId": "req-1"}));
        assert_eq!(payload.get_string("ContactId"), Some("4021".to_string()));
        assert_eq!(payload.request_id(), Some("req-1"));
    }

    #[test]
    fn test_error_envelope_variants() {
        let rpc: ErrorEnvelope = serde_json::from_value(json!({
            "Code": "Throttling.User", "Message": "slow down", "RequestId": "r1"
        }))
        .unwrap();
        assert_eq!(rpc.code(), Some("Throttling.User".to_string()));
        assert!(!rpc.reports_failure());

        let asapi: ErrorEnvelope = serde_json::from_value(json!({
            "asapiSuccess": false, "asapiErrorCode": "Forbidden", "asapiErrorMessage": "no"
        }))
        .unwrap();
        assert!(asapi.reports_failure());
        assert_eq!(asapi.code(), Some("Forbidden".to_string()));
        assert_eq!(asapi.message.as_deref(), Some("no"));
    }
}
