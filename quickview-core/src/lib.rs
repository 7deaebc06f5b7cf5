//! # quickview-core
//!
//! Quick-mode serialization for REST viewsets.
//!
//! A related-field-heavy list endpoint rendered by a nested serializer
//! issues one query per relation per record. Quick mode replaces that with
//! one bulk fetch of join-shaped rows plus one lookup table per to-many
//! relation, then flattens the rows in a single pass.
//!
//! This crate provides:
//! - Static entity schemas with relation classification
//! - The row flattener and datetime rendering
//! - The per-request quick-mode decision
//! - A framework-neutral viewset with page-number pagination
//! - An in-memory data source and reference nested serializer
//!
//! ## Schemas
//!
//! ```rust
//! use quickview_core::EntitySchema;
//!
//! let meal = EntitySchema::new("meal")
//!     .scalar("name")
//!     .many_to_one("chef", "chef")
//!     .many_to_many("ingredients", "ingredient");
//!
//! assert!(meal.validate().is_ok());
//! assert_eq!(meal.to_many_field_names(), vec!["ingredients"]);
//! ```
//!
//! ## The Quick Decision
//!
//! ```rust
//! use quickview_core::{determine_quick, QuickConfig, QuickMode, QuickRequest};
//!
//! let config = QuickConfig::default();
//! let request = QuickRequest::get().with_param("quick", "true");
//!
//! assert!(determine_quick(&request, &config));
//! assert_eq!(QuickMode::resolve(&request, &config, false), QuickMode::Quick);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use quickview_core::QuickConfig;
//!
//! let config = QuickConfig::from_toml_str(r#"
//!     always_quick = true
//!     datetime_format = "%d.%m.%Y"
//! "#).unwrap();
//!
//! assert!(config.always_quick);
//! assert_eq!(config.quick_param, "quick");
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use quickview_core::{ErrorCode, QuickError};
//!
//! let err = QuickError::not_found("meal");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert_eq!(err.status().as_u16(), 404);
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod flatten;
pub mod logging;
pub mod memory;
pub mod pagination;
pub mod query;
pub mod request;
pub mod schema;
pub mod serializer;
pub mod source;
pub mod value;
pub mod viewset;

pub use config::{EnvSource, MapEnvSource, QuickConfig, StdEnvSource};
pub use decision::{QuickMode, determine_quick};
pub use error::{ErrorCode, ErrorContext, QuickError, QuickResult};
pub use flatten::{DateTimeRender, RelationNames, flatten, format_query_data, prepare_row};
pub use pagination::{Page, PageParams};
pub use query::{Filter, Query};
pub use request::QuickRequest;
pub use schema::{EntitySchema, FieldDescriptor, FieldKind, RelationField, RelationType};
pub use serializer::{NestedSerializer, QuickCapable};
pub use source::{DataSource, LookupTable, LookupTables, Target};
pub use value::{Record, RecordId, Value};
pub use viewset::{QuickViewSet, Rendering, ViewResponse};

// Re-export logging utilities
pub use logging::{init as init_logging, init_debug, init_with_level, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::QuickConfig;
    pub use crate::decision::{QuickMode, determine_quick};
    pub use crate::error::{ErrorCode, QuickError, QuickResult};
    pub use crate::query::{Filter, Query};
    pub use crate::record;
    pub use crate::request::QuickRequest;
    pub use crate::schema::{EntitySchema, FieldDescriptor, RelationType};
    pub use crate::serializer::{NestedSerializer, QuickCapable};
    pub use crate::source::{DataSource, Target};
    pub use crate::value::{Record, RecordId, Value};
    pub use crate::viewset::{QuickViewSet, Rendering, ViewResponse};
}
