//! Statically declared entity schemas.
//!
//! An [`EntitySchema`] lists the fields of one entity type and classifies each
//! as a scalar or a relation. The flattener and the viewset read relation
//! cardinality from here instead of introspecting a live model.
//!
//! ```rust
//! use quickview_core::EntitySchema;
//!
//! let meals = EntitySchema::new("meal")
//!     .scalar("name")
//!     .scalar("served_at")
//!     .many_to_one("chef", "chef")
//!     .many_to_many("ingredients", "ingredient");
//!
//! assert_eq!(meals.to_many_field_names(), vec!["ingredients"]);
//! assert!(meals.field("chef").unwrap().many_to_one());
//! ```

use std::collections::HashSet;

use crate::error::{QuickError, QuickResult};
use crate::value::RecordId;

/// Type of relation between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-one relation (e.g., Meal has one Recipe).
    OneToOne,
    /// One-to-many relation (e.g., Chef has many Meals).
    OneToMany,
    /// Many-to-one relation (e.g., Meal belongs to Chef).
    ManyToOne,
    /// Many-to-many relation (e.g., Meal has many Ingredients).
    ManyToMany,
}

impl RelationType {
    /// Check if this relation can yield multiple related records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Check if this relation yields at most one related record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }
}

/// Relation details of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationField {
    /// Cardinality of the relation.
    pub relation_type: RelationType,
    /// Name of the related entity.
    pub related_entity: String,
    /// Stored id meaning "no related record", besides null.
    pub empty_marker: Option<RecordId>,
}

/// What kind of field a [`FieldDescriptor`] describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain value column.
    Scalar,
    /// A relation to another entity.
    Relation(RelationField),
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Field kind.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Create a scalar field.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar,
        }
    }

    /// Create a relation field.
    pub fn relation(
        name: impl Into<String>,
        relation_type: RelationType,
        related_entity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Relation(RelationField {
                relation_type,
                related_entity: related_entity.into(),
                empty_marker: None,
            }),
        }
    }

    /// Declare a stored id that means "no related record". No-op on scalars.
    pub fn with_empty_marker(mut self, marker: impl Into<RecordId>) -> Self {
        if let FieldKind::Relation(ref mut rel) = self.kind {
            rel.empty_marker = Some(marker.into());
        }
        self
    }

    /// Relation details, if this is a relation.
    pub fn relation_info(&self) -> Option<&RelationField> {
        match &self.kind {
            FieldKind::Relation(rel) => Some(rel),
            FieldKind::Scalar => None,
        }
    }

    fn relation_type(&self) -> Option<RelationType> {
        self.relation_info().map(|r| r.relation_type)
    }

    /// Whether the field is a relation of any kind.
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation(_))
    }

    /// Whether the field is a many-to-many relation.
    pub fn many_to_many(&self) -> bool {
        self.relation_type() == Some(RelationType::ManyToMany)
    }

    /// Whether the field is a one-to-many relation.
    pub fn one_to_many(&self) -> bool {
        self.relation_type() == Some(RelationType::OneToMany)
    }

    /// Whether the field is a many-to-one relation.
    pub fn many_to_one(&self) -> bool {
        self.relation_type() == Some(RelationType::ManyToOne)
    }

    /// Whether the field is a one-to-one relation.
    pub fn one_to_one(&self) -> bool {
        self.relation_type() == Some(RelationType::OneToOne)
    }

    /// Whether the relation is to-many (many-to-many or one-to-many).
    ///
    /// To-many fields are accumulated into lists when rows are flattened;
    /// everything else keeps a single value.
    pub fn is_to_many(&self) -> bool {
        self.many_to_many() || self.one_to_many()
    }

    /// Name of the related entity, for relations.
    pub fn related_entity(&self) -> Option<&str> {
        self.relation_info().map(|r| r.related_entity.as_str())
    }

    /// The declared empty marker, for relations.
    pub fn empty_marker(&self) -> Option<&RecordId> {
        self.relation_info().and_then(|r| r.empty_marker.as_ref())
    }
}

/// The declared fields of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl EntitySchema {
    /// Create a schema with no fields besides the implicit `id`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a scalar field.
    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.with_field(FieldDescriptor::scalar(name))
    }

    /// Add a one-to-one relation.
    pub fn one_to_one(self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.with_field(FieldDescriptor::relation(name, RelationType::OneToOne, related))
    }

    /// Add a one-to-many relation.
    pub fn one_to_many(self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.with_field(FieldDescriptor::relation(name, RelationType::OneToMany, related))
    }

    /// Add a many-to-one relation.
    pub fn many_to_one(self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.with_field(FieldDescriptor::relation(name, RelationType::ManyToOne, related))
    }

    /// Add a many-to-many relation.
    pub fn many_to_many(self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.with_field(FieldDescriptor::relation(name, RelationType::ManyToMany, related))
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the fields rendered in quick mode. `id` is implicit and
    /// always emitted first, so it is not repeated here.
    pub fn output_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name != "id")
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Relation fields of any cardinality.
    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_relation())
    }

    /// Names of the to-many relation fields.
    pub fn to_many_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_to_many())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Check the schema for declaration mistakes.
    pub fn validate(&self) -> QuickResult<()> {
        if self.name.trim().is_empty() {
            return Err(QuickError::configuration("entity schema has an empty name"));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(QuickError::configuration(format!(
                    "entity '{}' declares a field with an empty name",
                    self.name
                ))
                .with_model(&self.name));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(QuickError::configuration(format!(
                    "entity '{}' declares field '{}' more than once",
                    self.name, field.name
                ))
                .with_model(&self.name)
                .with_field(&field.name));
            }
            if let Some(rel) = field.relation_info() {
                if field.name == "id" {
                    return Err(QuickError::configuration(format!(
                        "entity '{}' declares 'id' as a relation",
                        self.name
                    ))
                    .with_model(&self.name)
                    .with_field("id"));
                }
                if rel.related_entity.trim().is_empty() {
                    return Err(QuickError::configuration(format!(
                        "relation '{}.{}' has no related entity",
                        self.name, field.name
                    ))
                    .with_model(&self.name)
                    .with_field(&field.name));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal_schema() -> EntitySchema {
        EntitySchema::new("meal")
            .scalar("name")
            .many_to_many("ingredients", "ingredient")
            .one_to_many("reviews", "review")
            .many_to_one("chef", "chef")
            .one_to_one("recipe", "recipe")
    }

    #[test]
    fn test_relation_type_cardinality() {
        assert!(RelationType::ManyToMany.is_many());
        assert!(RelationType::OneToMany.is_many());
        assert!(RelationType::ManyToOne.is_one());
        assert!(RelationType::OneToOne.is_one());
    }

    #[test]
    fn test_to_many_classification() {
        let schema = meal_schema();
        assert!(schema.field("ingredients").unwrap().is_to_many());
        assert!(schema.field("reviews").unwrap().is_to_many());
        assert!(!schema.field("chef").unwrap().is_to_many());
        assert!(!schema.field("recipe").unwrap().is_to_many());
        assert!(!schema.field("name").unwrap().is_to_many());
        assert_eq!(schema.to_many_field_names(), vec!["ingredients", "reviews"]);
    }

    #[test]
    fn test_classification_bits() {
        let schema = meal_schema();
        let name = schema.field("name").unwrap();
        assert!(!name.is_relation());
        assert!(!name.many_to_many() && !name.one_to_many());
        assert!(!name.many_to_one() && !name.one_to_one());

        let chef = schema.field("chef").unwrap();
        assert!(chef.is_relation());
        assert!(chef.many_to_one());
        assert_eq!(chef.related_entity(), Some("chef"));
        assert_eq!(schema.relation_fields().count(), 4);
    }

    #[test]
    fn test_output_field_names_skip_id() {
        let schema = EntitySchema::new("meal").scalar("id").scalar("name");
        assert_eq!(schema.output_field_names(), vec!["name"]);
    }

    #[test]
    fn test_empty_marker() {
        let field = FieldDescriptor::relation("tags", RelationType::ManyToMany, "tag")
            .with_empty_marker(0);
        assert_eq!(field.empty_marker(), Some(&RecordId::Int(0)));
        assert_eq!(FieldDescriptor::scalar("x").with_empty_marker(0).empty_marker(), None);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let schema = EntitySchema::new("meal").scalar("name").scalar("name");
        let err = schema.validate().unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(err.context.field.as_deref(), Some("name"));
    }

    #[test]
    fn test_validate_rejects_id_relation() {
        let schema = EntitySchema::new("meal").many_to_one("id", "other");
        assert!(schema.validate().is_err());
        assert!(meal_schema().validate().is_ok());
    }
}
