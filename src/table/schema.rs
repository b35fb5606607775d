//! Table declarations
//!
//! The declarative contract tying columns to sources, transforms and
//! hydration, plus the table's list/get entry points. Declarations are plain
//! data built once at start-up; see `crate::tables` for the AWS tables.

use super::fetcher::ListCall;
use super::hydrate::HydrateSource;
use super::qualifier::QueryContext;
use super::row::ColumnType;
use super::transform::{snake_to_camel, Transform};
use crate::aws::Service;
use crate::error::Result;
use serde_json::Value;

/// Builds provider request parameters from the query context
pub type ParamBuilder = fn(&QueryContext) -> Result<Value>;

/// Connection-level values every table can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionField {
    Partition,
    Region,
}

/// Where a column's raw value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    /// Dotted path into the base item; `None` reads the CamelCase column name
    Field(Option<&'static str>),
    /// Dotted path into a hydration result; `None` reads the CamelCase column name
    Hydrate {
        source: &'static str,
        path: Option<&'static str>,
    },
    Connection(ConnectionField),
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub description: &'static str,
    pub source: ColumnSource,
    pub transforms: Vec<Transform>,
}

impl Column {
    pub fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            description: "",
            source: ColumnSource::Field(None),
            transforms: Vec::new(),
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Read from an explicit path in the base item
    pub fn field(mut self, path: &'static str) -> Self {
        self.source = ColumnSource::Field(Some(path));
        self
    }

    /// Read the CamelCase column name from a hydration result
    pub fn hydrate(mut self, source: &'static str) -> Self {
        self.source = ColumnSource::Hydrate { source, path: None };
        self
    }

    /// Read an explicit path from a hydration result
    pub fn hydrate_field(mut self, source: &'static str, path: &'static str) -> Self {
        self.source = ColumnSource::Hydrate {
            source,
            path: Some(path),
        };
        self
    }

    pub fn connection(mut self, field: ConnectionField) -> Self {
        self.source = ColumnSource::Connection(field);
        self
    }

    pub fn transform(mut self, step: Transform) -> Self {
        self.transforms.push(step);
        self
    }

    /// Path the column reads, after applying the CamelCase default
    pub fn source_path(&self) -> String {
        let explicit = match &self.source {
            ColumnSource::Field(path) => *path,
            ColumnSource::Hydrate { path, .. } => *path,
            ColumnSource::Connection(_) => None,
        };
        explicit
            .map(|p| p.to_string())
            .unwrap_or_else(|| snake_to_camel(self.name))
    }

    /// Hydration source backing this column, if any
    pub fn hydrate_source(&self) -> Option<&'static str> {
        match &self.source {
            ColumnSource::Hydrate { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// Where a table's items keep their identifiers.
///
/// Paths are relative to the item's root object; for detail items (get
/// results) the root sits at `detail_root` inside the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub id_path: &'static str,
    pub arn_path: Option<&'static str>,
    pub detail_root: Option<&'static str>,
}

/// List strategy
#[derive(Debug, Clone)]
pub struct ListConfig {
    /// Key columns that must be qualified by equality
    pub key_columns: &'static [&'static str],
    pub call: ListCall,
    pub params: ParamBuilder,
}

/// Keyed get strategy
#[derive(Debug, Clone)]
pub struct GetConfig {
    pub key_columns: &'static [&'static str],
    pub service: Service,
    pub operation: &'static str,
    pub params: ParamBuilder,
    /// Provider error codes meaning "no such entity"
    pub not_found: &'static [&'static str],
    /// Not-found yields an empty result instead of an error
    pub ignore_not_found: bool,
    /// Hydration source whose data the get response already carries
    pub satisfies: Option<&'static str>,
}

/// Table definition
#[derive(Debug, Clone)]
pub struct Table {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: Vec<Column>,
    pub list: Option<ListConfig>,
    pub get: Option<GetConfig>,
    pub identity: Identity,
    pub hydrate: Vec<HydrateSource>,
}

impl Table {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            columns: Vec::new(),
            list: None,
            get: None,
            identity: Identity::default(),
            hydrate: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn list(mut self, list: ListConfig) -> Self {
        self.list = Some(list);
        self
    }

    pub fn get(mut self, get: GetConfig) -> Self {
        self.get = Some(get);
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn hydrate(mut self, source: HydrateSource) -> Self {
        self.hydrate.push(source);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn hydrate_source(&self, name: &str) -> Option<&HydrateSource> {
        self.hydrate.iter().find(|h| h.name == name)
    }
}
