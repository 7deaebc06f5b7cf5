//! # Quickview
//!
//! A quick-mode read path for REST resource viewsets.
//!
//! Quickview provides:
//! - Static entity schemas describing scalar and relation fields
//! - One-pass flattening of join-shaped rows through related lookup tables
//! - A per-request quick toggle, with full nested serialization as fallback
//! - Page-number pagination and an Axum router for the standard routes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quickview::prelude::*;
//! use quickview::memory::{MemorySerializer, MemorySource};
//!
//! #[tokio::main]
//! async fn main() -> QuickResult<()> {
//!     quickview::init_logging();
//!
//!     let meal = EntitySchema::new("meal")
//!         .scalar("name")
//!         .many_to_many("ingredients", "ingredient");
//!     let source = Arc::new(
//!         MemorySource::new()
//!             .with_schema(meal.clone())
//!             .with_schema(EntitySchema::new("ingredient").scalar("name")),
//!     );
//!
//!     let serializer = MemorySerializer::new(source.clone(), meal)
//!         .with_related_query("ingredients", Query::all("ingredient"));
//!     let viewset = QuickViewSet::new(
//!         Arc::new(serializer),
//!         source,
//!         Arc::new(QuickConfig::from_env()?),
//!     )?;
//!
//!     let app = viewset_router(Arc::new(viewset));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use quickview_core::*;

/// Axum routes for viewsets.
#[cfg(feature = "axum")]
#[cfg_attr(docsrs, doc(cfg(feature = "axum")))]
pub mod axum {
    pub use quickview_axum::{
        QUICK_MODE_HEADER, QuickAxumError, QuickRouterBuilder, Result, viewset_router,
    };
}

#[cfg(feature = "axum")]
pub use crate::axum::{QuickRouterBuilder, viewset_router};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use quickview_core::prelude::*;

    #[cfg(feature = "axum")]
    pub use crate::axum::{QuickAxumError, QuickRouterBuilder, viewset_router};
}
