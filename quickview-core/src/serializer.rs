//! The full nested serializer seam and the quick capability it may expose.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::QuickResult;
use crate::query::Query;
use crate::schema::EntitySchema;
use crate::value::RecordId;

/// A full (non-quick) serializer for one entity.
///
/// Writes always go through this trait, as do reads when quick mode is not
/// in effect. Output is nested JSON: each relation is rendered by the
/// related entity's serializer.
#[async_trait]
pub trait NestedSerializer: Send + Sync {
    /// Name of the serialized entity.
    fn entity(&self) -> &str;

    /// Serialize every record matching `query`, in query order.
    async fn serialize_many(&self, query: &Query) -> QuickResult<Vec<JsonValue>>;

    /// Serialize one record, or `None` when it does not exist.
    async fn retrieve(&self, id: &RecordId) -> QuickResult<Option<JsonValue>>;

    /// Validate and store a new record; returns its serialized form,
    /// which includes the assigned `id`.
    async fn create(&self, data: JsonValue) -> QuickResult<JsonValue>;

    /// Validate and store changes to an existing record.
    ///
    /// A partial update only touches the fields present in `data`.
    async fn update(&self, id: &RecordId, data: JsonValue, partial: bool) -> QuickResult<JsonValue>;

    /// Delete a record.
    async fn destroy(&self, id: &RecordId) -> QuickResult<()>;

    /// The quick capability, when this serializer supports quick mode.
    fn as_quick(&self) -> Option<&dyn QuickCapable> {
        None
    }
}

/// Declarations needed to render an entity in quick mode.
pub trait QuickCapable: Send + Sync {
    /// Field metadata of the entity.
    fn schema(&self) -> &EntitySchema;

    /// The query for the top-level collection. Defaults to all records.
    fn base_query(&self) -> Option<Query> {
        None
    }

    /// Queries for the related records of each to-many relation, keyed by
    /// field name. Undeclared relations default to all related records.
    fn related_queries(&self) -> HashMap<String, Query> {
        HashMap::new()
    }
}
