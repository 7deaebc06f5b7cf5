//! The framework-neutral view of an incoming request.

use std::collections::HashMap;

use http::Method;
use serde_json::Value as JsonValue;

/// What a viewset needs to know about a request.
#[derive(Debug, Clone)]
pub struct QuickRequest {
    /// HTTP method.
    pub method: Method,
    /// Decoded query string parameters.
    pub query_params: HashMap<String, String>,
    /// Parsed JSON body, for writes.
    pub body: Option<JsonValue>,
}

impl QuickRequest {
    /// Create a request with the given method.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query_params: HashMap::new(),
            body: None,
        }
    }

    /// A `GET` request.
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// A `POST` request carrying `body`.
    pub fn post(body: JsonValue) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    /// A `PUT` request carrying `body`.
    pub fn put(body: JsonValue) -> Self {
        Self::new(Method::PUT).with_body(body)
    }

    /// A `PATCH` request carrying `body`.
    pub fn patch(body: JsonValue) -> Self {
        Self::new(Method::PATCH).with_body(body)
    }

    /// Add a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Replace all query parameters.
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.query_params = params;
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Whether this is a `GET` request.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}
