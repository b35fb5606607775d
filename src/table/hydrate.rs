//! Hydration Resolver
//!
//! Fetches the extra provider data a query's wanted columns need, once per
//! source per item. Results are kept per source so column transforms read
//! from the namespace they were declared against.

use super::qualifier::{Operator, QueryContext};
use super::schema::{Identity, Table};
use super::transform::{project, snake_to_camel};
use crate::aws::{Service, Transport};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Which shape an item arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    /// Lightweight list entry
    Summary,
    /// Full get response
    Detail,
}

/// A base item from list or get
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Summary(Value),
    Detail(Value),
}

impl Item {
    pub fn shape(&self) -> ItemShape {
        match self {
            Item::Summary(_) => ItemShape::Summary,
            Item::Detail(_) => ItemShape::Detail,
        }
    }

    /// The provider value as received
    pub fn raw(&self) -> &Value {
        match self {
            Item::Summary(v) | Item::Detail(v) => v,
        }
    }

    /// The object base-field columns read from
    pub fn root<'a>(&'a self, identity: &Identity) -> &'a Value {
        match (self, identity.detail_root) {
            (Item::Detail(v), Some(root)) => project(v, root),
            _ => self.raw(),
        }
    }

    /// Logical identifier, extracted the same way from either shape
    pub fn identifier(&self, identity: &Identity) -> Option<String> {
        scalar_text(project(self.root(identity), identity.id_path))
    }

    pub fn arn(&self, identity: &Identity) -> Option<String> {
        identity
            .arn_path
            .and_then(|path| scalar_text(project(self.root(identity), path)))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifiers handed to a hydration call's parameter builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifiers {
    pub id: String,
    pub arn: Option<String>,
}

/// A provider call made per item
#[derive(Debug, Clone)]
pub struct HydrateCall {
    pub service: Service,
    pub operation: &'static str,
    /// `None` when the identifiers are not enough to build the request
    pub params: fn(&Identifiers) -> Option<Value>,
    /// Part of the response kept as the source's namespace
    pub result_path: Option<&'static str>,
    /// Provider error codes meaning the entity is gone
    pub not_found: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub enum HydrateKind {
    Call(HydrateCall),
    /// Echo the query's equality qualifiers, keyed by CamelCase column name
    KeyQuals,
}

/// Named hydration source declared on a table
#[derive(Debug, Clone)]
pub struct HydrateSource {
    pub name: &'static str,
    pub kind: HydrateKind,
}

impl HydrateSource {
    pub fn call(name: &'static str, call: HydrateCall) -> Self {
        Self {
            name,
            kind: HydrateKind::Call(call),
        }
    }

    pub fn key_quals(name: &'static str) -> Self {
        Self {
            name,
            kind: HydrateKind::KeyQuals,
        }
    }
}

/// Base item plus the results of every source resolved for it
#[derive(Debug, Clone)]
pub struct HydratedItem {
    pub item: Item,
    sources: HashMap<&'static str, Arc<Value>>,
}

impl HydratedItem {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            sources: HashMap::new(),
        }
    }

    pub fn insert(&mut self, source: &'static str, value: Arc<Value>) {
        self.sources.insert(source, value);
    }

    /// Result of a source, `Value::Null` if it was not resolved
    pub fn source(&self, name: &str) -> &Value {
        self.sources.get(name).map(|v| v.as_ref()).unwrap_or(&Value::Null)
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }
}

type CacheKey = (&'static str, String);

/// Query-scoped hydration results keyed by `(source, item identity)`.
///
/// Concurrent requests for the same key share one in-flight call. Failed
/// calls are not cached.
#[derive(Default)]
pub struct HydrationCache {
    cells: Mutex<HashMap<CacheKey, Arc<OnceCell<Option<Arc<Value>>>>>>,
}

impl HydrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(
        &self,
        source: &'static str,
        id: &str,
        fetch: F,
    ) -> Result<Option<Arc<Value>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry((source, id.to_string())).or_default())
        };

        cell.get_or_try_init(move || async move { fetch().await.map(|v| v.map(Arc::new)) })
            .await
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }
}

/// Resolves hydration sources for the items of one query
pub struct Hydrator {
    table: Arc<Table>,
    transport: Arc<dyn Transport>,
    ctx: Arc<QueryContext>,
    cache: Arc<HydrationCache>,
}

impl Hydrator {
    pub fn new(
        table: Arc<Table>,
        transport: Arc<dyn Transport>,
        ctx: Arc<QueryContext>,
        cache: Arc<HydrationCache>,
    ) -> Self {
        Self {
            table,
            transport,
            ctx,
            cache,
        }
    }

    /// Distinct sources behind the wanted columns, in column order
    pub fn sources_for(&self, wanted: &[usize]) -> Vec<&'static str> {
        let mut sources: Vec<&'static str> = Vec::new();
        for source in wanted
            .iter()
            .filter_map(|&idx| self.table.columns.get(idx))
            .filter_map(|col| col.hydrate_source())
        {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }

    /// Hydrate `item` for the wanted columns.
    ///
    /// Returns `Ok(None)` when a source reports the entity as gone, so the row
    /// is dropped; any other failure is returned as an error.
    pub async fn resolve(&self, item: Item, wanted: &[usize]) -> Result<Option<HydratedItem>> {
        let mut hydrated = HydratedItem::new(item);
        let satisfied_by_get = self.table.get.as_ref().and_then(|g| g.satisfies);

        for name in self.sources_for(wanted) {
            let Some(source) = self.table.hydrate_source(name) else {
                return Err(Error::Schema(format!(
                    "table '{}' has no hydration source '{}'",
                    self.table.name, name
                )));
            };

            if hydrated.item.shape() == ItemShape::Detail && satisfied_by_get == Some(name) {
                let detail = Arc::new(hydrated.item.raw().clone());
                hydrated.insert(name, detail);
                continue;
            }

            match &source.kind {
                HydrateKind::KeyQuals => {
                    hydrated.insert(name, Arc::new(key_quals(&self.ctx)));
                }
                HydrateKind::Call(call) => {
                    let identity = &self.table.identity;
                    let Some(id) = hydrated.item.identifier(identity) else {
                        return Err(Error::Schema(format!(
                            "{}: item carries no identifier at '{}' for hydration '{}'",
                            self.table.name, identity.id_path, name
                        )));
                    };
                    let ids = Identifiers {
                        arn: hydrated.item.arn(identity),
                        id,
                    };

                    let result = self
                        .cache
                        .get_or_fetch(name, &ids.id, || self.fetch(name, call, &ids))
                        .await?;

                    match result {
                        Some(value) => hydrated.insert(name, value),
                        None => {
                            tracing::warn!(
                                "{}: '{}' not found during {}, dropping row",
                                self.table.name,
                                ids.id,
                                name
                            );
                            return Ok(None);
                        }
                    }
                }
            }
        }

        Ok(Some(hydrated))
    }

    async fn fetch(
        &self,
        name: &str,
        call: &HydrateCall,
        ids: &Identifiers,
    ) -> Result<Option<Value>> {
        let Some(params) = (call.params)(ids) else {
            return Err(Error::Schema(format!(
                "{}: cannot build '{}' request for '{}'",
                self.table.name, name, ids.id
            )));
        };

        tracing::debug!("hydrate {} for {}", name, ids.id);

        match self.transport.call(call.service, call.operation, &params).await {
            Ok(response) => Ok(Some(match call.result_path {
                Some(path) => project(&response, path).clone(),
                None => response,
            })),
            Err(e) if e.is_any_of(call.not_found) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Equality qualifiers as an object of caller text; `granularity` is normalised to uppercase
pub fn key_quals(ctx: &QueryContext) -> Value {
    let mut map = Map::new();
    for qual in ctx.qualifiers.iter() {
        if qual.operator != Operator::Eq {
            continue;
        }
        let value = if qual.column == "granularity" {
            qual.raw.to_uppercase()
        } else {
            qual.raw.clone()
        };
        map.insert(snake_to_camel(&qual.column), Value::String(value));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::qualifier::{ForecastPolicy, LookbackPolicy, Qualifier, Qualifiers};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn identity() -> Identity {
        Identity {
            id_path: "Id",
            arn_path: Some("ARN"),
            detail_root: Some("Distribution"),
        }
    }

    #[test]
    fn test_identifier_from_either_shape() {
        let summary = Item::Summary(json!({"Id": "E1", "ARN": "arn:1"}));
        let detail = Item::Detail(json!({"ETag": "x", "Distribution": {"Id": "E1", "ARN": "arn:1"}}));
        assert_eq!(summary.identifier(&identity()).as_deref(), Some("E1"));
        assert_eq!(detail.identifier(&identity()).as_deref(), Some("E1"));
        assert_eq!(summary.arn(&identity()), detail.arn(&identity()));
    }

    #[test]
    fn test_identifier_missing() {
        let item = Item::Summary(json!({"Name": "no id"}));
        assert_eq!(item.identifier(&identity()), None);
    }

    #[test]
    fn test_key_quals_uppercases_granularity() {
        let ctx = QueryContext {
            table: "aws_cost_by_service".into(),
            qualifiers: Qualifiers::new()
                .with(Qualifier::eq("granularity", "monthly"))
                .with(Qualifier::eq("tag_key", "team")),
            now: Utc::now(),
            lookback: LookbackPolicy::default(),
            forecast: ForecastPolicy::default(),
            partition: "aws".into(),
            region: "us-east-1".into(),
        };
        assert_eq!(
            key_quals(&ctx),
            json!({"Granularity": "MONTHLY", "TagKey": "team"})
        );
    }

    #[tokio::test]
    async fn test_cache_fetches_once_per_key() {
        let cache = HydrationCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("tags", "E1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(json!({"Tags": []})))
                })
                .await
                .unwrap();
            assert!(value.is_some());
        }

        cache
            .get_or_fetch("tags", "E2", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_cache_does_not_keep_failures() {
        let cache = HydrationCache::new();
        let first = cache
            .get_or_fetch("tags", "E1", || async { Err(Error::Schema("boom".into())) })
            .await;
        assert!(first.is_err());

        let second = cache
            .get_or_fetch("tags", "E1", || async { Ok(Some(json!(1))) })
            .await
            .unwrap();
        assert_eq!(second.as_deref(), Some(&json!(1)));
    }
}
