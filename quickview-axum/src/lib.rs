//! Axum integration for quickview viewsets.
//!
//! [`viewset_router`] mounts the REST routes of one [`QuickViewSet`]:
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | `GET` | `/` | list |
//! | `POST` | `/` | create |
//! | `GET` | `/{id}` | retrieve |
//! | `PUT` | `/{id}` | update |
//! | `PATCH` | `/{id}` | partial update |
//! | `DELETE` | `/{id}` | destroy |
//!
//! Every response carries an `x-quick-mode` header (`quick` or `full`).
//! Errors are returned as `{"code", "message"}` with the status of their
//! [`ErrorCode`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quickview_axum::QuickRouterBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let meals: Arc<QuickViewSet> = build_meal_viewset();
//!
//!     let app = QuickRouterBuilder::new()
//!         .mount("/meals", meals)
//!         .build();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info};

use quickview_core::{ErrorCode, QuickError, QuickRequest, QuickViewSet, RecordId, ViewResponse};

// Re-export key types
pub use quickview_core::prelude::*;

/// Response header naming the mode a body was rendered in.
pub const QUICK_MODE_HEADER: HeaderName = HeaderName::from_static("x-quick-mode");

/// Errors returned by the viewset routes.
#[derive(Error, Debug)]
pub enum QuickAxumError {
    /// The viewset operation failed.
    #[error(transparent)]
    Quick(#[from] QuickError),

    /// The request body is not valid JSON.
    #[error("malformed JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

impl QuickAxumError {
    /// The status code of this error.
    pub fn status(&self) -> StatusCode {
        match self {
            QuickAxumError::Quick(e) => e.status(),
            QuickAxumError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> JsonValue {
        match self {
            QuickAxumError::Quick(e) => e.to_json(),
            QuickAxumError::InvalidBody(_) => serde_json::json!({
                "code": ErrorCode::Validation.code(),
                "message": self.to_string(),
            }),
        }
    }
}

impl IntoResponse for QuickAxumError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Viewset request failed");
        } else {
            debug!(status = %status, error = %self, "Viewset request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

/// Result type for viewset handlers.
pub type Result<T> = std::result::Result<T, QuickAxumError>;

fn into_http(response: ViewResponse) -> Response {
    let mode = if response.mode.is_quick() { "quick" } else { "full" };
    let mut http = match response.body {
        Some(body) => (response.status, Json(body)).into_response(),
        None => response.status.into_response(),
    };
    http.headers_mut()
        .insert(QUICK_MODE_HEADER, HeaderValue::from_static(mode));
    http
}

fn parse_id(raw: &str) -> RecordId {
    raw.parse::<RecordId>().unwrap_or_else(|never: Infallible| match never {})
}

fn request(method: Method, params: HashMap<String, String>, body: Bytes) -> Result<QuickRequest> {
    let mut request = QuickRequest::new(method).with_params(params);
    if !body.is_empty() {
        request = request.with_body(serde_json::from_slice(&body)?);
    }
    Ok(request)
}

async fn list(
    State(viewset): State<Arc<QuickViewSet>>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let request = request(method, params, Bytes::new())?;
    Ok(into_http(viewset.list(&request).await?))
}

async fn create(
    State(viewset): State<Arc<QuickViewSet>>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let request = request(method, params, body)?;
    Ok(into_http(viewset.create(&request).await?))
}

async fn retrieve(
    State(viewset): State<Arc<QuickViewSet>>,
    method: Method,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let request = request(method, params, Bytes::new())?;
    Ok(into_http(viewset.retrieve(&request, &parse_id(&id)).await?))
}

async fn update(
    State(viewset): State<Arc<QuickViewSet>>,
    method: Method,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let request = request(method, params, body)?;
    Ok(into_http(viewset.update(&request, &parse_id(&id)).await?))
}

async fn partial_update(
    State(viewset): State<Arc<QuickViewSet>>,
    method: Method,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let request = request(method, params, body)?;
    Ok(into_http(viewset.partial_update(&request, &parse_id(&id)).await?))
}

async fn destroy(
    State(viewset): State<Arc<QuickViewSet>>,
    method: Method,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let request = request(method, params, Bytes::new())?;
    Ok(into_http(viewset.destroy(&request, &parse_id(&id)).await?))
}

/// The REST routes of one viewset.
pub fn viewset_router(viewset: Arc<QuickViewSet>) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{id}",
            get(retrieve).put(update).patch(partial_update).delete(destroy),
        )
        .with_state(viewset)
}

/// Builder mounting several viewsets under their own path prefixes.
///
/// # Example
///
/// ```rust,ignore
/// let app = QuickRouterBuilder::new()
///     .mount("/meals", meals)
///     .mount("/ingredients", ingredients)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct QuickRouterBuilder {
    mounts: Vec<(String, Arc<QuickViewSet>)>,
}

impl QuickRouterBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `viewset` under `prefix` (for example `/meals`).
    pub fn mount(mut self, prefix: impl Into<String>, viewset: Arc<QuickViewSet>) -> Self {
        self.mounts.push((prefix.into(), viewset));
        self
    }

    /// Build the router.
    pub fn build(self) -> Router {
        let mut router = Router::new();
        for (prefix, viewset) in self.mounts {
            info!(prefix = %prefix, viewset = ?viewset, "Mounting viewset");
            router = router.nest(&prefix, viewset_router(viewset));
        }
        router
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{QUICK_MODE_HEADER, QuickAxumError, QuickRouterBuilder, Result, viewset_router};
    pub use quickview_core::prelude::*;
}
