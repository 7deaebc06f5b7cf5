use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{QuickError, QuickResult};
use crate::query::Query;
use crate::schema::EntitySchema;
use crate::source::DataSource;
use crate::value::{Record, RecordId, Value};

/// A [`DataSource`] over in-memory tables, one per registered schema.
#[derive(Debug, Default)]
pub struct MemorySource {
    schemas: HashMap<String, EntitySchema>,
    tables: RwLock<HashMap<String, Vec<Record>>>,
    value_fetches: AtomicUsize,
    id_fetches: AtomicUsize,
}

impl MemorySource {
    /// Create a source with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` and create its empty table.
    pub fn with_schema(mut self, schema: EntitySchema) -> Self {
        self.tables.get_mut().entry(schema.name().to_string()).or_default();
        self.schemas.insert(schema.name().to_string(), schema);
        self
    }

    /// The registered schema of `entity`.
    pub fn schema(&self, entity: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity)
    }

    /// Store a record and return its id.
    ///
    /// A record without an id gets the next integer id of its table.
    pub fn insert(&self, entity: &str, mut record: Record) -> QuickResult<RecordId> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(entity).ok_or_else(|| unknown_entity(entity))?;

        let id = match RecordId::of(&record) {
            Some(id) => {
                if table.iter().any(|r| RecordId::of(r).as_ref() == Some(&id)) {
                    return Err(QuickError::validation(format!("duplicate id {} for '{}'", id, entity))
                        .with_model(entity)
                        .with_field("id"));
                }
                id
            }
            None => {
                let next = table
                    .iter()
                    .filter_map(|r| match r.get("id") {
                        Some(Value::Int(i)) => Some(*i),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0)
                    + 1;
                RecordId::Int(next)
            }
        };

        record.shift_remove("id");
        let mut stored = Record::with_capacity(record.len() + 1);
        stored.insert("id".to_string(), id.to_value());
        stored.extend(record);
        table.push(stored);

        debug!(entity, id = %id, "Inserted record");
        Ok(id)
    }

    /// A copy of one stored record.
    pub fn get(&self, entity: &str, id: &RecordId) -> Option<Record> {
        self.tables
            .read()
            .get(entity)?
            .iter()
            .find(|r| RecordId::of(r).as_ref() == Some(id))
            .cloned()
    }

    /// Replace the stored record with the same id.
    pub fn replace(&self, entity: &str, record: Record) -> QuickResult<()> {
        let id = RecordId::of(&record).ok_or_else(|| QuickError::missing_id(entity))?;
        let mut tables = self.tables.write();
        let table = tables.get_mut(entity).ok_or_else(|| unknown_entity(entity))?;
        let slot = table
            .iter_mut()
            .find(|r| RecordId::of(r).as_ref() == Some(&id))
            .ok_or_else(|| QuickError::not_found(entity))?;
        *slot = record;
        Ok(())
    }

    /// Remove a record; returns whether it existed.
    pub fn remove(&self, entity: &str, id: &RecordId) -> bool {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(entity) else {
            return false;
        };
        let before = table.len();
        table.retain(|r| RecordId::of(r).as_ref() != Some(id));
        table.len() != before
    }

    /// Number of stored records of `entity`.
    pub fn len(&self, entity: &str) -> usize {
        self.tables.read().get(entity).map_or(0, Vec::len)
    }

    /// Stored records matching `query`, unexpanded, in storage order.
    pub fn records(&self, query: &Query) -> QuickResult<Vec<Record>> {
        let tables = self.tables.read();
        let table = tables
            .get(query.entity())
            .ok_or_else(|| unknown_entity(query.entity()))?;
        Ok(table.iter().filter(|r| query.matches(r)).cloned().collect())
    }

    /// Number of [`DataSource::fetch_values`] calls served.
    pub fn fetch_count(&self) -> usize {
        self.value_fetches.load(Ordering::Relaxed)
    }

    /// Number of [`DataSource::fetch_ids`] calls served.
    pub fn id_fetch_count(&self) -> usize {
        self.id_fetches.load(Ordering::Relaxed)
    }

    /// Reset both fetch counters.
    pub fn reset_fetch_counts(&self) {
        self.value_fetches.store(0, Ordering::Relaxed);
        self.id_fetches.store(0, Ordering::Relaxed);
    }
}

fn unknown_entity(entity: &str) -> QuickError {
    QuickError::data_source(format!("unknown entity '{}'", entity)).with_model(entity)
}

fn project(record: &Record, fields: &[&str]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    let mut row = Record::with_capacity(fields.len() + 1);
    row.insert("id".to_string(), record.get("id").cloned().unwrap_or(Value::Null));
    for &field in fields {
        row.insert(field.to_string(), record.get(field).cloned().unwrap_or(Value::Null));
    }
    row
}

/// One row per combination of to-many values; an empty list yields a
/// single row with a null value.
fn expand(row: Record, to_many: &[&str], out: &mut Vec<Record>) {
    let mut expanded = vec![row];
    for &field in to_many {
        let mut next = Vec::with_capacity(expanded.len());
        for row in expanded {
            let ids = match row.get(field) {
                Some(Value::List(ids)) => ids.clone(),
                _ => {
                    next.push(row);
                    continue;
                }
            };
            if ids.is_empty() {
                let mut row = row;
                row.insert(field.to_string(), Value::Null);
                next.push(row);
            } else {
                for id in ids {
                    let mut joined = row.clone();
                    joined.insert(field.to_string(), id);
                    next.push(joined);
                }
            }
        }
        expanded = next;
    }
    out.extend(expanded);
}

#[async_trait]
impl DataSource for MemorySource {
    async fn fetch_values(&self, query: &Query, fields: &[&str]) -> QuickResult<Vec<Record>> {
        self.value_fetches.fetch_add(1, Ordering::Relaxed);

        let to_many = self
            .schemas
            .get(query.entity())
            .map(EntitySchema::to_many_field_names)
            .unwrap_or_default();

        let tables = self.tables.read();
        let table = tables
            .get(query.entity())
            .ok_or_else(|| unknown_entity(query.entity()))?;

        let mut rows = Vec::with_capacity(table.len());
        for record in table.iter().filter(|r| query.matches(r)) {
            expand(project(record, fields), &to_many, &mut rows);
        }

        debug!(entity = %query.entity(), rows = rows.len(), "Fetched values");
        Ok(rows)
    }

    async fn fetch_ids(&self, query: &Query) -> QuickResult<Vec<RecordId>> {
        self.id_fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self.records(query)?.iter().filter_map(RecordId::of).collect())
    }

    fn schema(&self, entity: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::query::Filter;
    use crate::record;
    use pretty_assertions::assert_eq;

    fn source() -> MemorySource {
        let source = MemorySource::new().with_schema(
            EntitySchema::new("meal")
                .scalar("name")
                .many_to_many("ingredients", "ingredient")
                .many_to_many("tags", "tag")
                .many_to_one("chef", "chef"),
        );
        source
            .insert(
                "meal",
                record! { "name" => "Breakfast", "ingredients" => vec![1, 2], "tags" => vec![5], "chef" => 3 },
            )
            .unwrap();
        source
            .insert(
                "meal",
                record! { "name" => "Lunch", "ingredients" => Vec::<i64>::new(), "tags" => vec![5, 6], "chef" => Value::Null },
            )
            .unwrap();
        source
    }

    #[test]
    fn test_insert_assigns_ids() {
        let source = source();
        assert_eq!(source.len("meal"), 2);
        let lunch = source.get("meal", &RecordId::Int(2)).unwrap();
        assert_eq!(lunch.keys().next().map(String::as_str), Some("id"));
        assert_eq!(lunch["name"], Value::from("Lunch"));

        let id = source.insert("meal", record! { "id" => 10, "name" => "Dinner" }).unwrap();
        assert_eq!(id, RecordId::Int(10));
        let id = source.insert("meal", record! { "name" => "Supper" }).unwrap();
        assert_eq!(id, RecordId::Int(11));
    }

    #[test]
    fn test_insert_rejects_duplicates_and_unknown_entities() {
        let source = source();
        let err = source.insert("meal", record! { "id" => 1 }).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        let err = source.insert("drink", record! { "name" => "tea" }).unwrap_err();
        assert_eq!(err.code, ErrorCode::DataSource);
    }

    #[tokio::test]
    async fn test_fetch_values_emulates_join() {
        let source = source();
        let rows = source
            .fetch_values(&Query::all("meal"), &["name", "ingredients", "chef"])
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                record! { "id" => 1, "name" => "Breakfast", "ingredients" => 1, "chef" => 3 },
                record! { "id" => 1, "name" => "Breakfast", "ingredients" => 2, "chef" => 3 },
                record! { "id" => 2, "name" => "Lunch", "ingredients" => Value::Null, "chef" => Value::Null },
            ]
        );
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_values_cartesian_product() {
        let source = source();
        let rows = source
            .fetch_values(&Query::all("meal"), &["ingredients", "tags"])
            .await
            .unwrap();
        // 2 ingredients x 1 tag, then 1 (null) x 2 tags
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], record! { "id" => 2, "ingredients" => Value::Null, "tags" => 6 });
    }

    #[tokio::test]
    async fn test_fetch_all_fields() {
        let source = source();
        let rows = source.fetch_values(&Query::all("meal").id_in([RecordId::Int(1)]), &[]).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_ids_filters() {
        let source = source();
        let query = Query::all("meal").filter(Filter::equals("tags", 6));
        assert_eq!(source.fetch_ids(&query).await.unwrap(), vec![RecordId::Int(2)]);
        assert_eq!(source.id_fetch_count(), 1);

        let err = source.fetch_ids(&Query::all("drink")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DataSource);
    }

    #[test]
    fn test_replace_and_remove() {
        let source = source();
        source
            .replace("meal", record! { "id" => 2, "name" => "Late lunch" })
            .unwrap();
        assert_eq!(source.get("meal", &RecordId::Int(2)).unwrap()["name"], Value::from("Late lunch"));

        let err = source.replace("meal", record! { "id" => 99 }).unwrap_err();
        assert_eq!(err.code, ErrorCode::RecordNotFound);

        assert!(source.remove("meal", &RecordId::Int(2)));
        assert!(!source.remove("meal", &RecordId::Int(2)));
        assert_eq!(source.len("meal"), 1);
    }
}
