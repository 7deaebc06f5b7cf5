//! In-memory backend: a join-emulating [`DataSource`](crate::DataSource)
//! and a reference [`NestedSerializer`](crate::NestedSerializer) over it.
//!
//! Stored records keep to-many relations as lists of related ids and to-one
//! relations as a single id (or null). Reads expand the lists the way a SQL
//! join would, so the flattener sees the same row shapes as with a real
//! database.
//!
//! ```rust
//! use std::sync::Arc;
//! use quickview_core::memory::{MemorySerializer, MemorySource};
//! use quickview_core::{record, EntitySchema, Value};
//!
//! # fn main() -> quickview_core::QuickResult<()> {
//! let meal = EntitySchema::new("meal")
//!     .scalar("name")
//!     .many_to_many("ingredients", "ingredient");
//! let ingredient = EntitySchema::new("ingredient").scalar("name");
//!
//! let source = Arc::new(MemorySource::new().with_schema(meal.clone()).with_schema(ingredient));
//! source.insert("ingredient", record! { "name" => "beans" })?;
//! source.insert("meal", record! { "name" => "Lunch", "ingredients" => vec![1] })?;
//!
//! let serializer = MemorySerializer::new(source.clone(), meal);
//! assert_eq!(serializer.source().len("meal"), 1);
//! # Ok(())
//! # }
//! ```

mod serializer;
mod source;

pub use serializer::MemorySerializer;
pub use source::MemorySource;
