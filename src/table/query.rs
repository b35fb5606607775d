//! Query execution
//!
//! Ties the pieces together for one request: resolve qualifiers into a
//! retrieval strategy, stream base items, hydrate what the wanted columns
//! need, and build rows. The result is a lazy stream; nothing is fetched
//! until it is polled, and dropping it stops all provider traffic.

use super::fetcher::paginate_items;
use super::hydrate::{HydratedItem, HydrationCache, Hydrator, Item};
use super::qualifier::{resolve, ForecastPolicy, LookbackPolicy, QueryContext, Qualifiers, Retrieval};
use super::registry::TableRegistry;
use super::row::{ColumnValue, Row};
use super::schema::{ColumnSource, ConnectionField, GetConfig, Table};
use super::transform::{apply_chain, coerce, project};
use crate::aws::Transport;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Lazy sequence of rows, ending after the first error
pub type RowStream = BoxStream<'static, Result<Row>>;

/// What a column-level transform failure does to its row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformErrorPolicy {
    /// Null the column, log a warning, keep the row
    #[default]
    Null,
    /// Fail the query
    Fail,
}

/// Connection and policy values shared by every query
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub partition: String,
    pub region: String,
    pub lookback: LookbackPolicy,
    pub forecast: ForecastPolicy,
    /// Items hydrated concurrently
    pub hydrate_concurrency: usize,
    pub transform_errors: TransformErrorPolicy,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            partition: "aws".to_string(),
            region: "us-east-1".to_string(),
            lookback: LookbackPolicy::default(),
            forecast: ForecastPolicy::default(),
            hydrate_concurrency: 8,
            transform_errors: TransformErrorPolicy::default(),
        }
    }
}

/// One query: a table, the wanted columns (empty means all) and qualifiers
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub table: String,
    pub columns: Vec<String>,
    pub qualifiers: Qualifiers,
}

impl QueryRequest {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }
}

/// Executes queries against the registered tables
pub struct QueryEngine {
    registry: Arc<TableRegistry>,
    transport: Arc<dyn Transport>,
    settings: QuerySettings,
}

impl QueryEngine {
    pub fn new(registry: Arc<TableRegistry>, transport: Arc<dyn Transport>, settings: QuerySettings) -> Self {
        Self {
            registry,
            transport,
            settings,
        }
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Start a query. See [`QueryEngine::execute_at`].
    pub fn execute(&self, request: QueryRequest) -> Result<RowStream> {
        self.execute_at(request, Utc::now())
    }

    /// Start a query with an explicit clock for time windows.
    ///
    /// Table, column and qualifier errors are returned here, before any
    /// provider call. Provider and transform errors arrive on the stream.
    pub fn execute_at(&self, request: QueryRequest, now: DateTime<Utc>) -> Result<RowStream> {
        let table = self.registry.get(&request.table)?;
        let wanted = wanted_columns(&table, &request.columns)?;

        let query_id = Uuid::new_v4();
        let span = tracing::info_span!("query", id = %query_id, table = table.name);

        let ctx = Arc::new(QueryContext {
            table: table.name.to_string(),
            qualifiers: request.qualifiers,
            now,
            lookback: self.settings.lookback,
            forecast: self.settings.forecast,
            partition: self.settings.partition.clone(),
            region: self.settings.region.clone(),
        });

        let retrieval = span.in_scope(|| resolve(&table, &ctx))?;

        let items: BoxStream<'static, Result<Item>> = match retrieval {
            Retrieval::List(params) => {
                let list = table
                    .list
                    .as_ref()
                    .ok_or_else(|| Error::Schema(format!("table '{}' has no list strategy", table.name)))?;
                span.in_scope(|| tracing::debug!("list {}.{}", list.call.service, list.call.operation));
                paginate_items(Arc::clone(&self.transport), list.call.clone(), params)
                    .map_ok(Item::Summary)
                    .boxed()
            }
            Retrieval::Get(params) => {
                let get = table
                    .get
                    .clone()
                    .ok_or_else(|| Error::Schema(format!("table '{}' has no get strategy", table.name)))?;
                span.in_scope(|| tracing::debug!("get {}.{}", get.service, get.operation));
                let fut = get_item(
                    Arc::clone(&self.transport),
                    Arc::clone(&table),
                    get,
                    params,
                )
                .instrument(span.clone());
                stream::once(fut)
                    .try_filter_map(|item| future::ready(Ok(item)))
                    .boxed()
            }
        };

        let hydrator = Hydrator::new(
            Arc::clone(&table),
            Arc::clone(&self.transport),
            ctx,
            Arc::new(HydrationCache::new()),
        );
        // Only items needing provider calls are worth reading ahead for
        let width = if needs_calls(&table, &hydrator, &wanted) {
            self.settings.hydrate_concurrency.max(1)
        } else {
            1
        };

        let builder = Arc::new(RowBuilder {
            table,
            wanted,
            partition: self.settings.partition.clone(),
            region: self.settings.region.clone(),
            policy: self.settings.transform_errors,
        });
        let hydrator = Arc::new(hydrator);

        let rows = items
            .map(move |item| {
                let hydrator = Arc::clone(&hydrator);
                let builder = Arc::clone(&builder);
                async move {
                    let item = item?;
                    match hydrator.resolve(item, &builder.wanted).await? {
                        Some(hydrated) => builder.build(&hydrated).map(Some),
                        None => Ok(None),
                    }
                }
                .instrument(span.clone())
            })
            .buffered(width)
            .try_filter_map(|row| future::ready(Ok(row)));

        Ok(fuse_on_error(rows))
    }

    /// Run a query to completion, keeping at most `limit` rows
    pub async fn collect(&self, request: QueryRequest, limit: Option<usize>) -> Result<Vec<Row>> {
        let mut rows = self.execute(request)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await {
            out.push(row?);
            if limit.is_some_and(|l| out.len() >= l) {
                break;
            }
        }
        Ok(out)
    }
}

/// Column indices in request order; empty request means every column
fn wanted_columns(table: &Table, requested: &[String]) -> Result<Vec<usize>> {
    if requested.is_empty() {
        return Ok((0..table.columns.len()).collect());
    }

    let mut wanted = Vec::with_capacity(requested.len());
    for name in requested {
        let idx = table
            .columns
            .iter()
            .position(|c| c.name == name.as_str())
            .ok_or_else(|| Error::UnknownColumn {
                table: table.name.to_string(),
                column: name.clone(),
            })?;
        if !wanted.contains(&idx) {
            wanted.push(idx);
        }
    }
    Ok(wanted)
}

fn needs_calls(table: &Table, hydrator: &Hydrator, wanted: &[usize]) -> bool {
    use super::hydrate::HydrateKind;
    hydrator.sources_for(wanted).iter().any(|name| {
        matches!(
            table.hydrate_source(name).map(|s| &s.kind),
            Some(HydrateKind::Call(_))
        )
    })
}

/// Keyed lookup; `Ok(None)` when the entity is absent and that is allowed
async fn get_item(
    transport: Arc<dyn Transport>,
    table: Arc<Table>,
    get: GetConfig,
    params: Value,
) -> Result<Option<Item>> {
    match transport.call(get.service, get.operation, &params).await {
        Ok(response) => {
            let item = Item::Detail(response);
            if item.root(&table.identity).is_null() {
                tracing::debug!("{}: get returned no entity", table.name);
                return Ok(None);
            }
            Ok(Some(item))
        }
        Err(e) if e.is_any_of(get.not_found) => {
            if get.ignore_not_found {
                tracing::debug!("{}: {}, returning no rows", table.name, e);
                Ok(None)
            } else {
                Err(Error::NotFound {
                    table: table.name.to_string(),
                    code: e.code.unwrap_or_default(),
                })
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Yield items up to and including the first error, then end
fn fuse_on_error<S, T>(stream: S) -> BoxStream<'static, Result<T>>
where
    S: futures::Stream<Item = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut failed = false;
    stream
        .take_while(move |item| {
            let keep = !failed;
            failed |= item.is_err();
            future::ready(keep)
        })
        .boxed()
}

struct RowBuilder {
    table: Arc<Table>,
    wanted: Vec<usize>,
    partition: String,
    region: String,
    policy: TransformErrorPolicy,
}

impl RowBuilder {
    fn build(&self, hydrated: &HydratedItem) -> Result<Row> {
        let root = hydrated.item.root(&self.table.identity);
        let mut row = Row::new();

        for column in self.wanted.iter().filter_map(|&idx| self.table.columns.get(idx)) {
            let raw = match &column.source {
                ColumnSource::Field(_) => project(root, &column.source_path()).clone(),
                ColumnSource::Hydrate { source, .. } => {
                    project(hydrated.source(source), &column.source_path()).clone()
                }
                ColumnSource::Connection(ConnectionField::Partition) => {
                    Value::String(self.partition.clone())
                }
                ColumnSource::Connection(ConnectionField::Region) => Value::String(self.region.clone()),
            };

            let value = apply_chain(&column.transforms, raw).and_then(|v| coerce(column.column_type, v));
            match value {
                Ok(value) => row.push(column.name, value),
                Err(message) => match self.policy {
                    TransformErrorPolicy::Fail => return Err(Error::transform(column.name, message)),
                    TransformErrorPolicy::Null => {
                        tracing::warn!("{}.{}: {}", self.table.name, column.name, message);
                        row.push(column.name, ColumnValue::Null);
                    }
                },
            }
        }

        Ok(row)
    }
}
