//! Table abstraction layer
//!
//! Cloud resources are exposed as tables: each table declares its columns,
//! how to list or look up its items, and which extra provider calls back
//! which columns. The query engine reads those declarations; it has no
//! per-table code.
//!
//! # Architecture
//!
//! - [`qualifier`] - Turns query predicates into provider request parameters
//! - [`fetcher`] - Follows continuation tokens as a lazy stream
//! - [`hydrate`] - Per-item follow-up calls with a query-scoped cache
//! - [`transform`] - Pure value conversions and type coercion
//! - [`schema`] - Table and column declarations
//! - [`registry`] - Validated set of tables, built once at start-up
//! - [`query`] - Executes a request into a stream of [`Row`]s
//!
//! # Example
//!
//! ```ignore
//! use awsq::table::{QueryEngine, QueryRequest, Qualifier, Qualifiers};
//! use futures::TryStreamExt;
//!
//! async fn monthly_costs(engine: &QueryEngine) -> awsq::Result<()> {
//!     let request = QueryRequest::new("aws_cost_by_service")
//!         .columns(["service", "unblended_cost_amount"])
//!         .qualifiers(Qualifiers::new().with(Qualifier::eq("granularity", "MONTHLY")));
//!     let rows: Vec<_> = engine.execute(request)?.try_collect().await?;
//!     Ok(())
//! }
//! ```

pub mod fetcher;
pub mod hydrate;
pub mod qualifier;
pub mod query;
pub mod registry;
pub mod row;
pub mod schema;
pub mod transform;

pub use fetcher::{paginate, paginate_items, stream_items, Emit, ListCall, Page, PageItems};
pub use hydrate::{HydrateCall, HydrateSource, Identifiers, Item, ItemShape};
pub use qualifier::{
    ForecastPolicy, Granularity, LookbackPolicy, Operator, QualValue, Qualifier, Qualifiers,
    QueryContext,
};
pub use query::{QueryEngine, QueryRequest, QuerySettings, RowStream, TransformErrorPolicy};
pub use registry::TableRegistry;
pub use row::{ColumnType, ColumnValue, Row};
pub use schema::{Column, ConnectionField, GetConfig, Identity, ListConfig, Table};
pub use transform::Transform;
