//! Testing utilities for resource kinds.
//!
//! [`ScriptedInvoker`] stands in for the HTTP client: replies are queued per
//! action, every request is recorded, and failures are classified with the
//! request's own error codes exactly as the real client does.
//!
//! # Example
//!
//! ```ignore
//! use stackform::testing::ScriptedInvoker;
//! use serde_json::json;
//!
//! let invoker = ScriptedInvoker::new();
//! invoker.reply("CreateAlertContact", json!({"ContactId": 42}));
//! invoker.fail("DeleteAlertContact", 400, "Throttling.User");
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{ApiError, Invoker, Payload, RpcRequest};

#[derive(Debug, Clone)]
enum Reply {
    Ok(Value),
    Error { status: u16, code: String },
}

#[derive(Debug, Default)]
struct Script {
    queued: BTreeMap<String, VecDeque<Reply>>,
    standing: BTreeMap<String, Reply>,
    calls: Vec<RpcRequest>,
}

/// An in-memory [`Invoker`] driven by scripted replies.
///
/// One-shot replies are consumed in order; once an action's queue is empty
/// its standing reply (if any) answers every further call. An action with
/// nothing scripted fails with a fatal `Unscripted` error.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    script: Mutex<Script>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one successful reply for `action`.
    pub fn reply(&self, action: &str, body: Value) -> &Self {
        self.enqueue(action, Reply::Ok(body))
    }

    /// Queue one failed reply for `action`.
    pub fn fail(&self, action: &str, status: u16, code: &str) -> &Self {
        self.enqueue(
            action,
            Reply::Error {
                status,
                code: code.to_string(),
            },
        )
    }

    /// Answer every unqueued call to `action` with `body`.
    pub fn always(&self, action: &str, body: Value) -> &Self {
        self.stand(action, Reply::Ok(body))
    }

    /// Fail every unqueued call to `action`.
    pub fn always_fail(&self, action: &str, status: u16, code: &str) -> &Self {
        self.stand(
            action,
            Reply::Error {
                status,
                code: code.to_string(),
            },
        )
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<RpcRequest> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, action: &str) -> Vec<RpcRequest> {
        self.lock()
            .calls
            .iter()
            .filter(|r| r.action == action)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, action: &str) -> usize {
        self.lock().calls.iter().filter(|r| r.action == action).count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    fn enqueue(&self, action: &str, reply: Reply) -> &Self {
        self.lock()
            .queued
            .entry(action.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn stand(&self, action: &str, reply: Reply) -> &Self {
        self.lock().standing.insert(action.to_string(), reply);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A panicking test may poison the lock; the script itself stays usable.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn invoke(&self, request: &RpcRequest, _timeout: Duration) -> Result<Payload, ApiError> {
        let reply = {
            let mut script = self.lock();
            script.calls.push(request.clone());
            let queued = script
                .queued
                .get_mut(&request.action)
                .and_then(VecDeque::pop_front);
            queued.or_else(|| script.standing.get(&request.action).cloned())
        };

        match reply {
            Some(Reply::Ok(body)) => Ok(Payload::new(body)),
            Some(Reply::Error { status, code }) => Err(ApiError::Service {
                action: request.action.clone(),
                status,
                class: request.error_codes.classify(status, &code),
                message: format!("scripted {} failure", code),
                code,
                request_id: None,
            }),
            None => Err(ApiError::Service {
                action: request.action.clone(),
                status: 400,
                code: "Unscripted".to_string(),
                message: format!("no reply scripted for {}", request.action),
                request_id: None,
                class: crate::api::ErrorClass::Fatal,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ErrorClass, ErrorCodes, Product};
    use serde_json::json;

    const ARMS: Product = Product::new("ARMS", "2019-08-08");

    #[tokio::test]
    async fn test_queued_then_standing_replies() {
        let invoker = ScriptedInvoker::new();
        invoker
            .reply("GetUser", json!({"User": {"Uid": "1"}}))
            .always("GetUser", json!({"User": {"Uid": "2"}}));

        let request = RpcRequest::new(ARMS, "GetUser");
        let first = invoker.invoke(&request, Duration::ZERO).await.unwrap();
        let second = invoker.invoke(&request, Duration::ZERO).await.unwrap();
        let third = invoker.invoke(&request, Duration::ZERO).await.unwrap();

        assert_eq!(first.get_string("User.Uid").as_deref(), Some("1"));
        assert_eq!(second.get_string("User.Uid").as_deref(), Some("2"));
        assert_eq!(third.get_string("User.Uid").as_deref(), Some("2"));
        assert_eq!(invoker.call_count("GetUser"), 3);
    }

    #[tokio::test]
    async fn test_failures_use_request_error_codes() {
        let invoker = ScriptedInvoker::new();
        invoker
            .fail("DeleteTopic", 400, "ONS_SYSTEM_FLOW_CONTROL")
            .fail("DeleteTopic", 400, "ONS_SYSTEM_FLOW_CONTROL");

        let plain = RpcRequest::new(ARMS, "DeleteTopic");
        let err = invoker.invoke(&plain, Duration::ZERO).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Fatal);

        let special = RpcRequest::new(ARMS, "DeleteTopic")
            .with_error_codes(ErrorCodes::new(&["ONS_SYSTEM_FLOW_CONTROL"], &[]));
        let err = invoker.invoke(&special, Duration::ZERO).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Retryable);
    }

    #[tokio::test]
    async fn test_unscripted_action_is_fatal_and_recorded() {
        let invoker = ScriptedInvoker::new();
        let request = RpcRequest::new(ARMS, "Mystery").with_param("A", "1");
        let err = invoker.invoke(&request, Duration::ZERO).await.unwrap_err();
        assert_eq!(err.code(), Some("Unscripted"));
        assert_eq!(invoker.calls_to("Mystery")[0].params["A"], "1");
        assert_eq!(invoker.total_calls(), 1);
    }
}
