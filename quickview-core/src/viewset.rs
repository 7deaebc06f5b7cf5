//! The request orchestrator.
//!
//! A [`QuickViewSet`] decides once per request whether quick mode applies,
//! then either flattens raw rows through lookup tables or defers to the
//! full [`NestedSerializer`]. Writes always use the full serializer; when
//! the quick flag is set the written record is re-read in quick mode.
//!
//! ```rust
//! use std::sync::Arc;
//! use quickview_core::memory::{MemorySerializer, MemorySource};
//! use quickview_core::{record, EntitySchema, QuickConfig, QuickRequest, QuickViewSet};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> quickview_core::QuickResult<()> {
//! let meal = EntitySchema::new("meal").scalar("name");
//! let source = Arc::new(MemorySource::new().with_schema(meal.clone()));
//! source.insert("meal", record! { "name" => "Lunch" })?;
//!
//! let viewset = QuickViewSet::new(
//!     Arc::new(MemorySerializer::new(source.clone(), meal)),
//!     source,
//!     Arc::new(QuickConfig::default()),
//! )?;
//!
//! let response = viewset.list(&QuickRequest::get().with_param("quick", "true")).await?;
//! assert_eq!(response.body, Some(serde_json::json!([{"id": 1, "name": "Lunch"}])));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::config::QuickConfig;
use crate::decision::{QuickMode, determine_quick};
use crate::error::{QuickError, QuickResult};
use crate::flatten::{DateTimeRender, format_query_data};
use crate::pagination::{Page, PageParams};
use crate::query::Query;
use crate::request::QuickRequest;
use crate::schema::EntitySchema;
use crate::serializer::{NestedSerializer, QuickCapable};
use crate::source::{DataSource, LookupTables, Target};
use crate::value::{Record, RecordId, record_from_json, record_to_json, records_to_json};

/// Which serializer renders a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// Flattened rows; the output is always a list, so `many` does not apply.
    Quick,
    /// The full nested serializer.
    Full {
        /// Whether a collection is rendered.
        many: bool,
    },
}

impl Rendering {
    /// The mode a response rendered this way is reported in.
    pub fn mode(&self) -> QuickMode {
        match self {
            Self::Quick => QuickMode::Quick,
            Self::Full { .. } => QuickMode::Full,
        }
    }
}

/// A framework-neutral response.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewResponse {
    /// Status code.
    pub status: StatusCode,
    /// JSON body; `None` for empty responses.
    pub body: Option<JsonValue>,
    /// The mode the body was rendered in.
    pub mode: QuickMode,
}

impl ViewResponse {
    fn new(status: StatusCode, body: JsonValue, mode: QuickMode) -> Self {
        Self {
            status,
            body: Some(body),
            mode,
        }
    }

    fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
            mode: QuickMode::Full,
        }
    }
}

/// Serves one entity in quick or full mode.
pub struct QuickViewSet {
    serializer: Arc<dyn NestedSerializer>,
    source: Arc<dyn DataSource>,
    config: Arc<QuickConfig>,
    render: DateTimeRender,
    /// Fields fetched into each to-many relation's lookup table.
    related_fields: HashMap<String, Vec<String>>,
}

impl fmt::Debug for QuickViewSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickViewSet")
            .field("entity", &self.serializer.entity())
            .field("config", &self.config)
            .field("render", &self.render)
            .finish_non_exhaustive()
    }
}

impl QuickViewSet {
    /// Build a viewset.
    ///
    /// Fails with a configuration error when the serializer is not
    /// quick-capable, its schema is invalid, its declared queries do not
    /// fit the schema, or the source has no schema for a to-many target.
    pub fn new(
        serializer: Arc<dyn NestedSerializer>,
        source: Arc<dyn DataSource>,
        config: Arc<QuickConfig>,
    ) -> QuickResult<Self> {
        let quick = serializer
            .as_quick()
            .ok_or_else(|| QuickError::not_quick_capable(serializer.entity()))?;
        let schema = quick.schema();
        schema.validate()?;
        check_declarations(quick)?;
        let related_fields = related_projections(schema, source.as_ref())?;
        let render = DateTimeRender::from_config(&config)?;

        info!(
            entity = %schema.name(),
            fields = schema.fields().len(),
            to_many = schema.to_many_field_names().len(),
            "Quick viewset configured"
        );

        Ok(Self {
            serializer,
            source,
            config,
            render,
            related_fields,
        })
    }

    /// The configuration in effect.
    pub fn config(&self) -> &QuickConfig {
        &self.config
    }

    /// The served entity's schema.
    pub fn schema(&self) -> QuickResult<&EntitySchema> {
        Ok(self.quick()?.schema())
    }

    /// The quick flag of a request, regardless of method.
    pub fn is_quick(&self, request: &QuickRequest) -> bool {
        determine_quick(request, &self.config)
    }

    /// Choose the serializer for a response.
    pub fn rendering(&self, request: &QuickRequest, many: bool) -> Rendering {
        match QuickMode::resolve(request, &self.config, false) {
            QuickMode::Quick => Rendering::Quick,
            QuickMode::Full => Rendering::Full { many },
        }
    }

    fn quick(&self) -> QuickResult<&dyn QuickCapable> {
        self.serializer
            .as_quick()
            .ok_or_else(|| QuickError::not_quick_capable(self.serializer.entity()))
    }

    fn base_query(&self, quick: &dyn QuickCapable) -> Query {
        quick.base_query().unwrap_or_else(|| {
            let entity = quick.schema().name();
            warn!(
                entity = %entity,
                "No base query declared, defaulting to all records"
            );
            Query::all(entity)
        })
    }

    /// Build the lookup tables of every to-many relation.
    pub async fn lookup_tables(&self) -> QuickResult<LookupTables> {
        let quick = self.quick()?;
        let schema = quick.schema();
        let declared = quick.related_queries();
        let mut tables = LookupTables::new();

        for field in schema.fields().iter().filter(|f| f.is_to_many()) {
            let query = match declared.get(&field.name) {
                Some(query) => query.clone(),
                None => {
                    let related = field.related_entity().unwrap_or_default();
                    warn!(
                        entity = %schema.name(),
                        field = %field.name,
                        related = %related,
                        "No related query declared, defaulting to all related records; declare one explicitly"
                    );
                    Query::all(related)
                }
            };
            let fields: Vec<&str> = self
                .related_fields
                .get(&field.name)
                .map(|names| names.iter().map(String::as_str).collect())
                .unwrap_or_else(|| vec!["id"]);
            let rows = self.source.fetch_values(&query, &fields).await?;
            tables.insert_rows(field.name.as_str(), rows)?;
        }

        Ok(tables)
    }

    /// Read formatted rows in quick mode, scoped to `target` when given.
    pub async fn quick_read(&self, target: Option<Target<'_>>) -> QuickResult<Vec<Record>> {
        let quick = self.quick()?;
        let schema = quick.schema();
        let query = match target {
            Some(target) => self.base_query(quick).id_in(target.ids(schema.name())?),
            None => self.base_query(quick),
        };
        self.flatten_query(schema, &query).await
    }

    async fn flatten_query(&self, schema: &EntitySchema, query: &Query) -> QuickResult<Vec<Record>> {
        let tables = self.lookup_tables().await?;
        format_query_data(self.source.as_ref(), schema, query, &tables, &self.render).await
    }

    /// List the collection, paginated when page parameters apply.
    pub async fn list(&self, request: &QuickRequest) -> QuickResult<ViewResponse> {
        let rendering = self.rendering(request, true);
        let mode = rendering.mode();
        let quick = self.quick()?;
        let schema = quick.schema();
        let query = self.base_query(quick);

        let Some(params) = PageParams::from_request(request, &self.config)? else {
            debug!(entity = %schema.name(), ?mode, "Listing records");
            let body = match rendering {
                Rendering::Quick => records_to_json(&self.flatten_query(schema, &query).await?),
                Rendering::Full { .. } => JsonValue::Array(self.serializer.serialize_many(&query).await?),
            };
            return Ok(ViewResponse::new(StatusCode::OK, body, mode));
        };

        let ids = self.source.fetch_ids(&query).await?;
        let page_ids = params.slice(&ids)?.to_vec();
        debug!(
            entity = %schema.name(),
            ?mode,
            page = params.page,
            page_size = params.page_size,
            count = ids.len(),
            "Listing page"
        );

        let scoped = query.id_in(page_ids);
        let results: Vec<JsonValue> = match rendering {
            Rendering::Quick => self
                .flatten_query(schema, &scoped)
                .await?
                .iter()
                .map(record_to_json)
                .collect(),
            Rendering::Full { .. } => self.serializer.serialize_many(&scoped).await?,
        };

        let body = serde_json::to_value(Page::new(params, ids.len(), results))
            .map_err(|e| QuickError::internal("failed to encode page").with_source(e))?;
        Ok(ViewResponse::new(StatusCode::OK, body, mode))
    }

    /// Fetch one record. In quick mode the body is a one-element list.
    pub async fn retrieve(&self, request: &QuickRequest, id: &RecordId) -> QuickResult<ViewResponse> {
        let rendering = self.rendering(request, false);
        let mode = rendering.mode();
        let entity = self.serializer.entity();
        debug!(entity = %entity, id = %id, ?mode, "Retrieving record");

        let body = match rendering {
            Rendering::Quick => {
                let rows = self.quick_read(Some(Target::SingleId(id))).await?;
                if rows.is_empty() {
                    return Err(QuickError::not_found(entity));
                }
                records_to_json(&rows)
            }
            Rendering::Full { .. } => self
                .serializer
                .retrieve(id)
                .await?
                .ok_or_else(|| QuickError::not_found(entity))?,
        };
        Ok(ViewResponse::new(StatusCode::OK, body, mode))
    }

    /// Create a record through the full serializer.
    pub async fn create(&self, request: &QuickRequest) -> QuickResult<ViewResponse> {
        let entity = self.serializer.entity();
        let data = request_body(request, entity)?;
        let written = self.serializer.create(data).await?;
        debug!(entity = %entity, "Created record");

        if !self.is_quick(request) {
            return Ok(ViewResponse::new(StatusCode::CREATED, written, QuickMode::Full));
        }
        let id = RecordId::from_json(&written["id"]).ok_or_else(|| QuickError::missing_id(entity))?;
        let rows = self.quick_read(Some(Target::SingleId(&id))).await?;
        Ok(ViewResponse::new(StatusCode::CREATED, records_to_json(&rows), QuickMode::Quick))
    }

    /// Replace a record.
    pub async fn update(&self, request: &QuickRequest, id: &RecordId) -> QuickResult<ViewResponse> {
        self.write(request, id, false).await
    }

    /// Update the fields present in the body.
    pub async fn partial_update(&self, request: &QuickRequest, id: &RecordId) -> QuickResult<ViewResponse> {
        self.write(request, id, true).await
    }

    async fn write(&self, request: &QuickRequest, id: &RecordId, partial: bool) -> QuickResult<ViewResponse> {
        let entity = self.serializer.entity();
        self.ensure_exists(id).await?;
        let data = request_body(request, entity)?;
        let written = self.serializer.update(id, data, partial).await?;
        debug!(entity = %entity, id = %id, partial, "Updated record");

        if !self.is_quick(request) {
            return Ok(ViewResponse::new(StatusCode::OK, written, QuickMode::Full));
        }
        let instance = record_from_json(written)
            .ok_or_else(|| QuickError::internal(format!("serialized {} is not an object", entity)))?;
        let rows = self.quick_read(Some(Target::SingleInstance(&instance))).await?;
        Ok(ViewResponse::new(StatusCode::OK, records_to_json(&rows), QuickMode::Quick))
    }

    /// Delete a record.
    pub async fn destroy(&self, _request: &QuickRequest, id: &RecordId) -> QuickResult<ViewResponse> {
        self.ensure_exists(id).await?;
        self.serializer.destroy(id).await?;
        debug!(entity = %self.serializer.entity(), id = %id, "Deleted record");
        Ok(ViewResponse::no_content())
    }

    async fn ensure_exists(&self, id: &RecordId) -> QuickResult<()> {
        let quick = self.quick()?;
        let query = self.base_query(quick).id_in([id.clone()]);
        if self.source.fetch_ids(&query).await?.is_empty() {
            return Err(QuickError::not_found(self.serializer.entity()));
        }
        Ok(())
    }
}

fn request_body(request: &QuickRequest, entity: &str) -> QuickResult<JsonValue> {
    request
        .body
        .clone()
        .ok_or_else(|| QuickError::validation("a JSON request body is required").with_model(entity))
}

/// The `id` and non-to-many fields of every to-many relation's entity.
///
/// Lookup rows must be one per related record, so the related entity's own
/// to-many fields stay out of the projection.
fn related_projections(
    schema: &EntitySchema,
    source: &dyn DataSource,
) -> QuickResult<HashMap<String, Vec<String>>> {
    let mut projections = HashMap::new();
    for field in schema.fields().iter().filter(|f| f.is_to_many()) {
        let related = field.related_entity().unwrap_or_default();
        let related_schema = source.schema(related).ok_or_else(|| {
            QuickError::configuration(format!(
                "no schema registered for '{}', the target of '{}'",
                related, field.name
            ))
            .with_model(schema.name())
            .with_field(&field.name)
        })?;
        let mut fields = vec!["id".to_string()];
        fields.extend(
            related_schema
                .fields()
                .iter()
                .filter(|f| !f.is_to_many() && f.name != "id")
                .map(|f| f.name.clone()),
        );
        projections.insert(field.name.clone(), fields);
    }
    Ok(projections)
}

fn check_declarations(quick: &dyn QuickCapable) -> QuickResult<()> {
    let schema = quick.schema();

    if let Some(base) = quick.base_query() {
        if base.entity() != schema.name() {
            return Err(QuickError::configuration(format!(
                "base query selects '{}' but the serializer renders '{}'",
                base.entity(),
                schema.name()
            ))
            .with_model(schema.name()));
        }
    }

    for (name, query) in quick.related_queries() {
        let Some(field) = schema.field(&name) else {
            return Err(QuickError::configuration(format!(
                "related query declared for unknown field '{}'",
                name
            ))
            .with_model(schema.name())
            .with_field(&name));
        };
        let Some(related) = field.related_entity() else {
            return Err(QuickError::configuration(format!(
                "related query declared for '{}', which is not a relation",
                name
            ))
            .with_model(schema.name())
            .with_field(&name));
        };
        if query.entity() != related {
            return Err(QuickError::configuration(format!(
                "related query for '{}' selects '{}' instead of '{}'",
                name,
                query.entity(),
                related
            ))
            .with_model(schema.name())
            .with_field(&name));
        }
    }

    Ok(())
}
