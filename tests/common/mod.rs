//! Shared helpers for integration tests
//!
//! `MockTransport` answers provider calls from per-operation queues and
//! records every request so tests can assert on call counts and parameters.

#![allow(dead_code)]

use async_trait::async_trait;
use awsq::aws::{Service, Transport};
use awsq::table::{QueryEngine, QuerySettings, TableRegistry};
use awsq::TransportError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

type Reply = Result<Value, TransportError>;

/// In-memory transport with scripted replies
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<(Service, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<(Service, String, Value)>>,
    yields: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the runtime `yields` times before each reply, so that
    /// concurrently polled calls overlap
    pub fn yielding(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    /// Queue a successful reply for `operation`
    pub fn respond(&self, service: Service, operation: &str, body: Value) -> &Self {
        self.push(service, operation, Ok(body))
    }

    /// Queue a provider error with `code` for `operation`
    pub fn fail(&self, service: Service, operation: &str, status: u16, code: &str) -> &Self {
        let err = TransportError::new(service.name(), operation, format!("{} (mock)", code))
            .with_status(status)
            .with_code(code);
        self.push(service, operation, Err(err))
    }

    fn push(&self, service: Service, operation: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry((service, operation.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Total calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Calls made to one operation
    pub fn calls_to(&self, operation: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, op, _)| op == operation)
            .count()
    }

    /// Request parameters sent to one operation, in call order
    pub fn requests_to(&self, operation: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, op, _)| op == operation)
            .map(|(_, _, params)| params.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, service: Service, operation: &str, params: &Value) -> Reply {
        self.requests
            .lock()
            .unwrap()
            .push((service, operation.to_string(), params.clone()));

        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(service, operation.to_string()))
            .and_then(|queue| queue.pop_front());

        reply.unwrap_or_else(|| {
            Err(TransportError::new(
                service.name(),
                operation,
                "no scripted reply",
            ))
        })
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 30).unwrap()
}

/// Engine over every AWS table, backed by `transport`
pub fn engine(transport: Arc<MockTransport>) -> QueryEngine {
    engine_with(transport, QuerySettings::default())
}

pub fn engine_with(transport: Arc<MockTransport>, settings: QuerySettings) -> QueryEngine {
    let registry = Arc::new(TableRegistry::aws().expect("tables should register"));
    QueryEngine::new(registry, transport, settings)
}
