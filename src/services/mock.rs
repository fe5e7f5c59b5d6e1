use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::error::{PortalError, Result};
use crate::services::api::Transport;

#[derive(Clone)]
pub(crate) enum Reply {
    Json(Value),
    Status(u16),
    /// Never resolves.
    Hang,
    /// Resolves with the value once the gate is opened.
    Gated(Arc<Notify>, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: &'static str,
    pub endpoint: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, endpoint: &str, reply: Reply) {
        self.replies
            .lock()
            .expect("replies lock")
            .insert(endpoint.to_string(), reply);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn calls_to(&self, endpoint: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    fn record(&self, call: Call) -> Option<Reply> {
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .get(&call.endpoint)
            .cloned();
        self.calls.lock().expect("calls lock").push(call);
        reply
    }

    async fn answer(reply: Option<Reply>) -> Result<Value> {
        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(PortalError::Http {
                status,
                body: "mock failure".to_string(),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Gated(gate, value)) => {
                gate.notified().await;
                Ok(value)
            }
            None => Err(PortalError::Http {
                status: 404,
                body: "no mock reply".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, endpoint: &str, bearer: Option<&str>) -> Result<Value> {
        let reply = self.record(Call {
            method: "GET",
            endpoint: endpoint.to_string(),
            bearer: bearer.map(str::to_string),
            body: None,
        });
        Self::answer(reply).await
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let reply = self.record(Call {
            method: "POST",
            endpoint: endpoint.to_string(),
            bearer: None,
            body: Some(body),
        });
        Self::answer(reply).await
    }
}
