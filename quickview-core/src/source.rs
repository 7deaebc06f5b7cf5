//! The data-access seam and the request-scoped lookup tables built from it.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{QuickError, QuickResult};
use crate::query::Query;
use crate::schema::EntitySchema;
use crate::value::{Record, RecordId};

/// Bulk read access to stored records.
///
/// Implementations answer each call with a single backend round trip.
/// Rows are join-shaped: a record with several values in a to-many field
/// comes back once per related id.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch `fields` plus `id` for every record matching `query`.
    /// An empty `fields` slice selects every field.
    async fn fetch_values(&self, query: &Query, fields: &[&str]) -> QuickResult<Vec<Record>>;

    /// Fetch the ids of the records matching `query`, in query order.
    async fn fetch_ids(&self, query: &Query) -> QuickResult<Vec<RecordId>>;

    /// The schema of a stored entity, if known.
    fn schema(&self, entity: &str) -> Option<&EntitySchema>;
}

/// What a read is scoped to.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A single record, by id.
    SingleId(&'a RecordId),
    /// A single record already in hand.
    SingleInstance(&'a Record),
    /// Several records already in hand.
    Collection(&'a [Record]),
}

impl Target<'_> {
    /// Normalize to the list of ids to query.
    pub fn ids(&self, entity: &str) -> QuickResult<Vec<RecordId>> {
        match self {
            Self::SingleId(id) => Ok(vec![(*id).clone()]),
            Self::SingleInstance(record) => {
                RecordId::of(record).map(|id| vec![id]).ok_or_else(|| QuickError::missing_id(entity))
            }
            Self::Collection(records) => records
                .iter()
                .map(|r| RecordId::of(r).ok_or_else(|| QuickError::missing_id(entity)))
                .collect(),
        }
    }
}

/// Related records of one relation, keyed by id.
pub type LookupTable = HashMap<RecordId, Record>;

/// Per-relation lookup tables for one request.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    tables: HashMap<String, LookupTable>,
}

impl LookupTables {
    /// Create an empty set of tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table for `relation`.
    pub fn insert(&mut self, relation: impl Into<String>, table: LookupTable) {
        self.tables.insert(relation.into(), table);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_table(mut self, relation: impl Into<String>, table: LookupTable) -> Self {
        self.insert(relation, table);
        self
    }

    /// Key `rows` by their `id` and add them as the table for `relation`.
    ///
    /// Every row must carry a distinct id; join-shaped rows with repeated
    /// ids are rejected rather than collapsed.
    pub fn insert_rows(
        &mut self,
        relation: impl Into<String>,
        rows: impl IntoIterator<Item = Record>,
    ) -> QuickResult<()> {
        let relation = relation.into();
        let mut table = LookupTable::new();
        for row in rows {
            let id = RecordId::of(&row).ok_or_else(|| QuickError::missing_id(&relation).with_field(&relation))?;
            if table.contains_key(&id) {
                return Err(QuickError::duplicate_lookup(&relation, &id));
            }
            table.insert(id, row);
        }
        self.tables.insert(relation, table);
        Ok(())
    }

    /// Builder-style [`insert_rows`](Self::insert_rows).
    pub fn with_rows(
        mut self,
        relation: impl Into<String>,
        rows: impl IntoIterator<Item = Record>,
    ) -> QuickResult<Self> {
        self.insert_rows(relation, rows)?;
        Ok(self)
    }

    /// The table for `relation`, if built.
    pub fn get(&self, relation: &str) -> Option<&LookupTable> {
        self.tables.get(relation)
    }

    /// Whether a table exists for `relation`.
    pub fn contains(&self, relation: &str) -> bool {
        self.tables.contains_key(relation)
    }

    /// Resolve `id` through the table of `relation`.
    ///
    /// Both a missing table and a missing id are errors: they mean the
    /// declared related queries do not match the stored data.
    pub fn lookup(&self, relation: &str, id: &RecordId) -> QuickResult<&Record> {
        self.tables
            .get(relation)
            .ok_or_else(|| QuickError::missing_lookup_table(relation))?
            .get(id)
            .ok_or_else(|| QuickError::lookup_missing(relation, id))
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables were built.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
