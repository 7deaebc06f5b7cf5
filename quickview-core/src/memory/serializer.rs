use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{QuickError, QuickResult};
use crate::query::Query;
use crate::schema::{EntitySchema, FieldDescriptor};
use crate::serializer::{NestedSerializer, QuickCapable};
use crate::value::{Record, RecordId, Value, record_to_json};

use super::MemorySource;

/// A nested serializer over a [`MemorySource`].
///
/// Reads render to-one relations as the related object (or `null`) and
/// to-many relations as arrays of related objects. Writes take related
/// ids and check that they exist.
#[derive(Debug, Clone)]
pub struct MemorySerializer {
    source: Arc<MemorySource>,
    schema: EntitySchema,
    quick: bool,
    base_query: Option<Query>,
    related_queries: HashMap<String, Query>,
}

impl MemorySerializer {
    /// A quick-capable serializer for `schema`.
    pub fn new(source: Arc<MemorySource>, schema: EntitySchema) -> Self {
        Self {
            source,
            schema,
            quick: true,
            base_query: None,
            related_queries: HashMap::new(),
        }
    }

    /// Do not expose the quick capability.
    pub fn without_quick(mut self) -> Self {
        self.quick = false;
        self
    }

    /// Declare the top-level query.
    pub fn with_base_query(mut self, query: Query) -> Self {
        self.base_query = Some(query);
        self
    }

    /// Declare the query for the related records of `field`.
    pub fn with_related_query(mut self, field: impl Into<String>, query: Query) -> Self {
        self.related_queries.insert(field.into(), query);
        self
    }

    /// The backing source.
    pub fn source(&self) -> &MemorySource {
        &self.source
    }

    fn render(&self, record: &Record) -> JsonValue {
        let mut out = Map::with_capacity(self.schema.fields().len() + 1);
        out.insert(
            "id".to_string(),
            record.get("id").map_or(JsonValue::Null, Value::to_json),
        );

        for field in self.schema.fields().iter().filter(|f| f.name != "id") {
            let stored = record.get(&field.name).unwrap_or(&Value::Null);
            let rendered = match field.related_entity() {
                None => stored.to_json(),
                Some(related) if field.is_to_many() => JsonValue::Array(
                    stored
                        .as_list()
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|v| self.related(related, v))
                        .collect(),
                ),
                Some(related) => self.related(related, stored).unwrap_or(JsonValue::Null),
            };
            out.insert(field.name.clone(), rendered);
        }

        JsonValue::Object(out)
    }

    fn related(&self, entity: &str, id: &Value) -> Option<JsonValue> {
        let id = RecordId::from_value(id)?;
        self.source.get(entity, &id).map(|r| record_to_json(&r))
    }

    /// Turn a write body into a stored record. On a partial write, fields
    /// missing from `data` keep their value in `current`.
    fn parse_body(&self, data: JsonValue, current: Option<&Record>, partial: bool) -> QuickResult<Record> {
        let JsonValue::Object(mut body) = data else {
            return Err(QuickError::validation("request body must be a JSON object")
                .with_model(self.schema.name()));
        };

        if let Some(unknown) = body
            .keys()
            .find(|k| k.as_str() != "id" && self.schema.field(k).is_none())
        {
            return Err(QuickError::invalid_field(unknown.as_str(), "unknown field")
                .with_model(self.schema.name()));
        }

        let mut record = Record::with_capacity(self.schema.fields().len() + 1);
        if let Some(id) = current.and_then(|c| c.get("id")) {
            record.insert("id".to_string(), id.clone());
        }

        for field in self.schema.fields().iter().filter(|f| f.name != "id") {
            let value = match body.remove(&field.name) {
                Some(json) => self.parse_field(field, json)?,
                None if partial => current
                    .and_then(|c| c.get(&field.name))
                    .cloned()
                    .unwrap_or(Value::Null),
                None if field.is_to_many() => Value::List(Vec::new()),
                None => Value::Null,
            };
            record.insert(field.name.clone(), value);
        }

        Ok(record)
    }

    fn parse_field(&self, field: &FieldDescriptor, json: JsonValue) -> QuickResult<Value> {
        let Some(related) = field.related_entity() else {
            return Ok(Value::from(json));
        };

        if field.is_to_many() {
            let JsonValue::Array(items) = json else {
                return Err(QuickError::invalid_field(&field.name, "expected a list of related ids"));
            };
            let ids = items
                .iter()
                .map(|item| self.related_id(field, related, item))
                .collect::<QuickResult<Vec<_>>>()?;
            Ok(Value::List(ids.into_iter().map(Value::from).collect()))
        } else if json.is_null() {
            Ok(Value::Null)
        } else {
            Ok(self.related_id(field, related, &json)?.into())
        }
    }

    fn related_id(&self, field: &FieldDescriptor, related: &str, json: &JsonValue) -> QuickResult<RecordId> {
        let id = RecordId::from_json(json)
            .ok_or_else(|| QuickError::invalid_field(&field.name, format!("{} is not a valid id", json)))?;
        if self.source.get(related, &id).is_none() {
            return Err(QuickError::invalid_field(
                &field.name,
                format!("related {} {} does not exist", related, id),
            ));
        }
        Ok(id)
    }
}

#[async_trait]
impl NestedSerializer for MemorySerializer {
    fn entity(&self) -> &str {
        self.schema.name()
    }

    async fn serialize_many(&self, query: &Query) -> QuickResult<Vec<JsonValue>> {
        let records = self.source.records(query)?;
        debug!(entity = %self.schema.name(), records = records.len(), "Serializing records");
        Ok(records.iter().map(|r| self.render(r)).collect())
    }

    async fn retrieve(&self, id: &RecordId) -> QuickResult<Option<JsonValue>> {
        Ok(self.source.get(self.schema.name(), id).map(|r| self.render(&r)))
    }

    async fn create(&self, data: JsonValue) -> QuickResult<JsonValue> {
        let record = self.parse_body(data, None, false)?;
        let id = self.source.insert(self.schema.name(), record)?;
        self.retrieve(&id)
            .await?
            .ok_or_else(|| QuickError::internal(format!("created {} {} vanished", self.schema.name(), id)))
    }

    async fn update(&self, id: &RecordId, data: JsonValue, partial: bool) -> QuickResult<JsonValue> {
        let current = self
            .source
            .get(self.schema.name(), id)
            .ok_or_else(|| QuickError::not_found(self.schema.name()))?;
        let record = self.parse_body(data, Some(&current), partial)?;
        self.source.replace(self.schema.name(), record)?;
        Ok(self.render(&self.source.get(self.schema.name(), id).unwrap_or(current)))
    }

    async fn destroy(&self, id: &RecordId) -> QuickResult<()> {
        if self.source.remove(self.schema.name(), id) {
            Ok(())
        } else {
            Err(QuickError::not_found(self.schema.name()))
        }
    }

    fn as_quick(&self) -> Option<&dyn QuickCapable> {
        if self.quick { Some(self as &dyn QuickCapable) } else { None }
    }
}

impl QuickCapable for MemorySerializer {
    fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    fn base_query(&self) -> Option<Query> {
        self.base_query.clone()
    }

    fn related_queries(&self) -> HashMap<String, Query> {
        self.related_queries.clone()
    }
}
