//! Quick-mode row flattening.
//!
//! A join-style query returns one raw row per (record, related id)
//! combination. [`flatten`] folds those rows back into one formatted row per
//! record id: to-many relation ids are replaced by their related records from
//! the [`LookupTables`] and accumulated into lists, everything else keeps the
//! value of the first row seen for that id.
//!
//! ```rust
//! use quickview_core::flatten::{flatten, DateTimeRender, RelationNames};
//! use quickview_core::{record, LookupTables, Value};
//!
//! # fn main() -> quickview_core::QuickResult<()> {
//! let tables = LookupTables::new().with_rows(
//!     "ingredients",
//!     vec![
//!         record! { "id" => 1, "name" => "beans" },
//!         record! { "id" => 2, "name" => "bacon" },
//!     ],
//! )?;
//! let rows = vec![
//!     record! { "id" => 1, "name" => "Breakfast", "ingredients" => 1 },
//!     record! { "id" => 1, "name" => "Breakfast", "ingredients" => 2 },
//! ];
//!
//! let formatted = flatten(
//!     &rows,
//!     &["name", "ingredients"],
//!     &RelationNames::new(["ingredients"]),
//!     &tables,
//!     &DateTimeRender::disabled(),
//! )?;
//!
//! assert_eq!(formatted.len(), 1);
//! assert_eq!(formatted[0]["ingredients"].as_list().map(|l| l.len()), Some(2));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::debug;

use crate::config::{QuickConfig, validate_datetime_format};
use crate::error::{QuickError, QuickResult};
use crate::query::Query;
use crate::schema::EntitySchema;
use crate::source::{DataSource, LookupTables};
use crate::value::{Record, RecordId, Value};

/// How datetime values are rendered while flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeRender {
    enabled: bool,
    format: String,
}

impl DateTimeRender {
    /// Render datetimes with `format`; fails if chrono cannot render it.
    pub fn new(format: impl Into<String>) -> QuickResult<Self> {
        let format = format.into();
        validate_datetime_format(&format)?;
        Ok(Self {
            enabled: true,
            format,
        })
    }

    /// Leave datetime values untouched.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            format: String::new(),
        }
    }

    /// Build from `handle_datetimes` and `datetime_format`.
    pub fn from_config(config: &QuickConfig) -> QuickResult<Self> {
        if config.handle_datetimes {
            Self::new(config.datetime_format.as_str())
        } else {
            Ok(Self::disabled())
        }
    }

    /// Whether datetimes are rendered.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The render format.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Render one datetime.
    pub fn render(&self, dt: &NaiveDateTime) -> QuickResult<String> {
        let mut out = String::with_capacity(self.format.len() + 8);
        write!(out, "{}", dt.format(&self.format)).map_err(|_| {
            QuickError::configuration(format!("cannot render datetime with '{}'", self.format))
        })?;
        Ok(out)
    }

    /// Render every top-level datetime value of a record.
    pub fn render_record(&self, record: &Record) -> QuickResult<Record> {
        record
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::DateTime(dt) => Value::String(self.render(dt)?),
                    other => other.clone(),
                };
                Ok((k.clone(), v))
            })
            .collect()
    }
}

/// The relation fields that are expanded through lookup tables and
/// accumulated across duplicate rows.
#[derive(Debug, Clone, Default)]
pub struct RelationNames<'a> {
    names: Vec<&'a str>,
    empty_markers: HashMap<&'a str, &'a RecordId>,
}

impl<'a> RelationNames<'a> {
    /// Relations without empty markers.
    pub fn new(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            names: names.into_iter().collect(),
            empty_markers: HashMap::new(),
        }
    }

    /// The to-many relations of `schema`, with their declared empty markers.
    pub fn to_many(schema: &'a EntitySchema) -> Self {
        let mut relations = Self::default();
        for field in schema.fields().iter().filter(|f| f.is_to_many()) {
            relations.names.push(field.name.as_str());
            if let Some(marker) = field.empty_marker() {
                relations.empty_markers.insert(field.name.as_str(), marker);
            }
        }
        relations
    }

    /// Treat `marker` as "no related record" for `relation`.
    pub fn with_empty_marker(mut self, relation: &'a str, marker: &'a RecordId) -> Self {
        self.empty_markers.insert(relation, marker);
        self
    }

    /// Whether `name` is one of the relations.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name)
    }

    /// Iterate over the relation names.
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.names.iter().copied()
    }

    /// Whether no relations are declared.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn is_empty_marker(&self, relation: &str, id: &RecordId) -> bool {
        self.empty_markers.get(relation).is_some_and(|m| *m == id)
    }
}

fn row_id(row: &Record) -> QuickResult<(RecordId, Value)> {
    let value = row.get("id").ok_or_else(|| QuickError::missing_id("row"))?;
    let id = RecordId::from_value(value).ok_or_else(|| QuickError::missing_id("row"))?;
    Ok((id, value.clone()))
}

/// Prepare one raw row for output.
///
/// `id` always comes first. For each requested field:
/// - a missing or null value becomes `Null`, or `[]` for relation fields;
/// - a relation value is looked up in its table and wrapped in a one-element
///   list so duplicates can later be concatenated;
/// - a datetime is rendered when `render` is enabled;
/// - anything else, nested maps and lists included, passes through.
pub fn prepare_row(
    row: &Record,
    field_names: &[&str],
    relations: &RelationNames<'_>,
    tables: &LookupTables,
    render: &DateTimeRender,
) -> QuickResult<Record> {
    let (_, id_value) = row_id(row)?;
    let mut prepared = Record::with_capacity(field_names.len() + 1);
    prepared.insert("id".to_string(), id_value);

    for &name in field_names {
        let is_relation = relations.contains(name);
        let value = match row.get(name).filter(|v| !v.is_null()) {
            None if is_relation => Value::List(Vec::new()),
            None => Value::Null,
            Some(stored) if is_relation => {
                let id = RecordId::from_value(stored)
                    .ok_or_else(|| QuickError::lookup_missing(name, format!("{:?}", stored)))?;
                if relations.is_empty_marker(name, &id) {
                    Value::List(Vec::new())
                } else {
                    let related = tables.lookup(name, &id)?;
                    let related = if render.enabled() {
                        render.render_record(related)?
                    } else {
                        related.clone()
                    };
                    Value::List(vec![Value::Map(related)])
                }
            }
            Some(Value::DateTime(dt)) if render.enabled() => Value::String(render.render(dt)?),
            Some(stored) => stored.clone(),
        };
        prepared.insert(name.to_string(), value);
    }

    Ok(prepared)
}

/// Fold join-shaped raw rows into one formatted row per id.
///
/// The first row seen for an id is kept as prepared. Each later row with
/// the same id only appends its non-empty to-many relation values. Output
/// follows first-seen id order.
pub fn flatten(
    rows: &[Record],
    field_names: &[&str],
    relations: &RelationNames<'_>,
    tables: &LookupTables,
    render: &DateTimeRender,
) -> QuickResult<Vec<Record>> {
    let mut formatted: IndexMap<RecordId, Record> = IndexMap::with_capacity(rows.len());
    let mut merged = 0usize;

    for row in rows {
        let (id, _) = row_id(row)?;
        let mut prepared = prepare_row(row, field_names, relations, tables, render)?;

        match formatted.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(prepared);
            }
            Entry::Occupied(mut slot) => {
                merged += 1;
                let existing = slot.get_mut();
                for name in relations.iter() {
                    let Some(Value::List(items)) = existing.get_mut(name) else {
                        continue;
                    };
                    if let Some(Value::List(extra)) = prepared.swap_remove(name) {
                        items.extend(extra);
                    }
                }
            }
        }
    }

    debug!(
        raw_rows = rows.len(),
        formatted_rows = formatted.len(),
        merged_rows = merged,
        "Flattened rows"
    );

    Ok(formatted.into_values().collect())
}

/// Fetch and flatten the records of `schema` matching `query`.
///
/// Every row is fetched in one [`DataSource::fetch_values`] call; the
/// to-many relations come from the schema.
pub async fn format_query_data(
    source: &dyn DataSource,
    schema: &EntitySchema,
    query: &Query,
    tables: &LookupTables,
    render: &DateTimeRender,
) -> QuickResult<Vec<Record>> {
    let field_names = schema.output_field_names();
    let relations = RelationNames::to_many(schema);

    let mut fetch_fields = field_names.clone();
    fetch_fields.push("id");
    let rows = source.fetch_values(query, &fetch_fields).await?;

    debug!(
        entity = %schema.name(),
        rows = rows.len(),
        relations = relations.names.len(),
        "Fetched rows for quick formatting"
    );

    flatten(&rows, &field_names, &relations, tables, render).map_err(|e| {
        if e.context.model.is_none() {
            e.with_model(schema.name())
        } else {
            e
        }
    })
}
