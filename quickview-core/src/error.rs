//! Error types for flattening, configuration and viewset operations.
//!
//! Every error carries an [`ErrorCode`] for programmatic handling, a message,
//! and an [`ErrorContext`] naming the model/field involved plus suggestions.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: Q{category}{number}
//! - 1xxx: Request errors (not found, invalid parameter)
//! - 2xxx: Flattening errors (lookup inconsistencies, missing ids)
//! - 3xxx: Write validation errors (delegated to the nested serializer)
//! - 4xxx: Data source errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use quickview_core::{QuickError, ErrorCode};
//!
//! let err = QuickError::not_found("Meal");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert_eq!(err.code.code(), "Q1001");
//! assert!(err.to_string().contains("Meal"));
//! ```

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Result type for quickview operations.
pub type QuickResult<T> = Result<T, QuickError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request errors (1xxx)
    /// Record or page not found (Q1001).
    RecordNotFound = 1001,
    /// Invalid request parameter (Q1002).
    InvalidParameter = 1002,

    // Flattening errors (2xxx)
    /// A relation references an id absent from its lookup table (Q2001).
    LookupMissing = 2001,
    /// A relation has no lookup table at all (Q2002).
    MissingLookupTable = 2002,
    /// A raw row has no usable `id` (Q2003).
    MissingId = 2003,
    /// A lookup table received two rows with the same id (Q2004).
    DuplicateLookupId = 2004,

    // Write errors (3xxx)
    /// Write validation failed (Q3001).
    Validation = 3001,

    // Data source errors (4xxx)
    /// The data source failed to answer a query (Q4001).
    DataSource = 4001,

    // Configuration errors (7xxx)
    /// Invalid configuration (Q7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (Q9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "Q1001").
    pub fn code(&self) -> String {
        format!("Q{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidParameter => "Invalid parameter",
            Self::LookupMissing => "Related record missing from lookup table",
            Self::MissingLookupTable => "Lookup table missing for relation",
            Self::MissingId => "Row has no id",
            Self::DuplicateLookupId => "Duplicate id in lookup table",
            Self::Validation => "Validation failed",
            Self::DataSource => "Data source error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// The HTTP status a host framework should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RecordNotFound => StatusCode::NOT_FOUND,
            Self::InvalidParameter | Self::Validation => StatusCode::BAD_REQUEST,
            Self::DataSource => StatusCode::SERVICE_UNAVAILABLE,
            Self::LookupMissing
            | Self::MissingLookupTable
            | Self::MissingId
            | Self::DuplicateLookupId
            | Self::InvalidConfiguration
            | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error is the caller's fault rather than the server's.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

/// Errors that can occur while building quick views.
#[derive(Error, Debug)]
pub struct QuickError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QuickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QuickError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the request", model),
        )
        .with_model(&model)
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        let param = param.into();
        Self::new(
            ErrorCode::InvalidParameter,
            format!("Invalid value for parameter '{}': {}", param, message.into()),
        )
        .with_field(&param)
    }

    /// Create a lookup inconsistency error: `relation` points at `key`, which
    /// its lookup table does not contain.
    pub fn lookup_missing(relation: impl Into<String>, key: impl fmt::Display) -> Self {
        let relation = relation.into();
        Self::new(
            ErrorCode::LookupMissing,
            format!(
                "Relation '{}' references id {} which is absent from its lookup table",
                relation, key
            ),
        )
        .with_field(&relation)
        .with_suggestion(format!(
            "Ensure the related query declared for '{}' covers every referenced record",
            relation
        ))
    }

    /// Create a duplicate lookup row error: the rows fetched for `relation`
    /// repeat `key`.
    pub fn duplicate_lookup(relation: impl Into<String>, key: impl fmt::Display) -> Self {
        let relation = relation.into();
        Self::new(
            ErrorCode::DuplicateLookupId,
            format!("Lookup table for '{}' received id {} more than once", relation, key),
        )
        .with_field(&relation)
        .with_suggestion("Fetch related rows without their to-many fields")
    }

    /// Create a missing lookup table error.
    pub fn missing_lookup_table(relation: impl Into<String>) -> Self {
        let relation = relation.into();
        Self::new(
            ErrorCode::MissingLookupTable,
            format!("No lookup table was built for relation '{}'", relation),
        )
        .with_field(&relation)
    }

    /// Create a missing id error for a row of `model`.
    pub fn missing_id(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::MissingId,
            format!("A {} row has no usable 'id' value", model),
        )
        .with_model(&model)
        .with_suggestion("Include 'id' in every fetched row")
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Create a validation error for a specific field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::Validation,
            format!("Invalid value for field '{}': {}", field, message.into()),
        )
        .with_field(&field)
    }

    /// Create a data source error.
    pub fn data_source(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataSource, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create the error raised when a viewset is built around a serializer
    /// without the quick capability.
    pub fn not_quick_capable(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::configuration(format!(
            "QuickViewSet for {} must use a quick-capable serializer",
            model
        ))
        .with_model(&model)
        .with_suggestion("Implement QuickCapable and return it from NestedSerializer::as_quick")
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    // ============== Type Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        self.code == ErrorCode::InvalidConfiguration
    }

    /// Check if this is a lookup inconsistency.
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::LookupMissing | ErrorCode::MissingLookupTable | ErrorCode::DuplicateLookupId
        )
    }

    /// The HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Render the error as the JSON body returned to API clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code.code(),
            "message": self.message,
        })
    }
}

impl From<toml::de::Error> for QuickError {
    fn from(err: toml::de::Error) -> Self {
        QuickError::configuration(format!("failed to parse configuration: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for QuickError {
    fn from(err: std::io::Error) -> Self {
        QuickError::configuration(format!("failed to read configuration: {}", err)).with_source(err)
    }
}
