//! AWS table declarations
//!
//! One file per provider service. Each exposes a `tables()` function that
//! returns its declarations; [`all`] gathers them for the registry.

pub mod cloudfront;
pub mod cost_explorer;
pub mod pricing;
pub mod route53;

use crate::table::{Column, ColumnType, ConnectionField, Table};

/// Columns present on every table
pub fn standard_columns() -> Vec<Column> {
    vec![
        Column::new("partition", ColumnType::String)
            .describe("The AWS partition in which the resource is located (aws, aws-cn, or aws-us-gov)")
            .connection(ConnectionField::Partition),
        Column::new("region", ColumnType::String)
            .describe("The AWS region in which the resource is located")
            .connection(ConnectionField::Region),
    ]
}

/// Every table, unvalidated
pub fn all() -> Vec<Table> {
    let mut tables = Vec::new();
    tables.extend(cost_explorer::tables());
    tables.extend(pricing::tables());
    tables.extend(cloudfront::tables());
    tables.extend(route53::tables());
    tables
}
