use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::Method;
use serde_json::Value;

/// Process-wide key/value pairs injected into every request context.
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Copies every entry under the read lock.
    pub fn snapshot(&self) -> Arc<HashMap<String, Value>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Arc::new(values.clone())
    }
}

/// Per-request context handed to controller methods.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: Arc<HashMap<String, Value>>,
    handler: String,
    method: Method,
    path: String,
}

impl RequestContext {
    pub fn new(
        values: Arc<HashMap<String, Value>>,
        handler: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        RequestContext {
            values,
            handler: handler.into(),
            method,
            path: path.into(),
        }
    }

    /// A value set with `set_context_value` before this request started.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn handler_name(&self) -> &str {
        &self.handler
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
