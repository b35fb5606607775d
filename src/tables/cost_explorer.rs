//! Cost Explorer tables
//!
//! Cost and usage grouped by account, service, usage type or tag, plus the
//! spend forecast. Responses nest metrics under `ResultsByTime[].Groups[]`;
//! the page mappers here flatten them into one item per period and group.

use super::standard_columns;
use crate::aws::Service;
use crate::error::Result;
use crate::table::qualifier::{cost_window, forecast_window, QueryContext};
use crate::table::transform::project;
use crate::table::{Column, ColumnType, HydrateSource, ListCall, ListConfig, PageItems, Table};
use serde_json::{json, Map, Value};

/// Hydration source echoing the query's key qualifiers
const QUALS: &str = "cost_quals";

/// Metrics requested from GetCostAndUsage, in response-key form
pub const COST_METRICS: [&str; 7] = [
    "BlendedCost",
    "UnblendedCost",
    "NetUnblendedCost",
    "AmortizedCost",
    "NetAmortizedCost",
    "UsageQuantity",
    "NormalizedUsageAmount",
];

const FORECAST_METRIC: &str = "UNBLENDED_COST";

pub fn tables() -> Vec<Table> {
    vec![
        cost_table(
            "aws_cost_by_account",
            "AWS Cost Explorer - Cost by Linked Account",
            &["granularity"],
            by_account_params,
            vec![Column::new("linked_account_id", ColumnType::String)
                .describe("The linked AWS account ID")
                .field("Dimension1")],
        ),
        cost_table(
            "aws_cost_by_service",
            "AWS Cost Explorer - Cost by Service",
            &["granularity"],
            by_service_params,
            vec![Column::new("service", ColumnType::String)
                .describe("The AWS service the costs belong to")
                .field("Dimension1")],
        ),
        cost_table(
            "aws_cost_by_service_usage_type",
            "AWS Cost Explorer - Cost by Service and Usage Type",
            &["granularity"],
            by_service_usage_type_params,
            vec![
                Column::new("service", ColumnType::String)
                    .describe("The AWS service the costs belong to")
                    .field("Dimension1"),
                Column::new("usage_type", ColumnType::String)
                    .describe("The usage type within the service")
                    .field("Dimension2"),
            ],
        ),
        cost_table(
            "aws_cost_by_tag",
            "AWS Cost Explorer - Cost by Tag",
            &["granularity", "tag_key"],
            by_tag_params,
            vec![Column::new("tag_key", ColumnType::String)
                .describe("The tag key and value the costs are grouped by")
                .field("Dimension1")],
        ),
        forecast_table(),
    ]
}

fn cost_table(
    name: &'static str,
    description: &'static str,
    key_columns: &'static [&'static str],
    params: fn(&QueryContext) -> Result<Value>,
    dimension_columns: Vec<Column>,
) -> Table {
    Table::new(name, description)
        .columns(dimension_columns)
        .columns(cost_columns())
        .columns([granularity_column()])
        .columns(standard_columns())
        .list(ListConfig {
            key_columns,
            call: ListCall {
                service: Service::CostExplorer,
                operation: "GetCostAndUsage",
                items: PageItems::Map(flatten_results_by_time),
                request_token: "NextPageToken",
                response_token: "NextPageToken",
            },
            params,
        })
        .hydrate(HydrateSource::key_quals(QUALS))
}

fn granularity_column() -> Column {
    Column::new("granularity", ColumnType::String)
        .describe("The time bucket of each row: HOURLY, DAILY or MONTHLY")
        .hydrate(QUALS)
}

fn cost_columns() -> Vec<Column> {
    use ColumnType::{Bool, Double, String, Timestamp};

    vec![
        Column::new("period_start", Timestamp).describe("Start timestamp for this cost metric"),
        Column::new("period_end", Timestamp).describe("End timestamp for this cost metric"),
        Column::new("estimated", Bool).describe("Whether the result is estimated"),
        Column::new("blended_cost_amount", Double)
            .describe("Cost for the period, averaged across the consolidated billing family"),
        Column::new("blended_cost_unit", String).describe("Unit type for blended costs"),
        Column::new("unblended_cost_amount", Double)
            .describe("Cost for the period, as charged on the day"),
        Column::new("unblended_cost_unit", String).describe("Unit type for unblended costs"),
        Column::new("net_unblended_cost_amount", Double)
            .describe("Unblended cost after all applicable discounts"),
        Column::new("net_unblended_cost_unit", String).describe("Unit type for net unblended costs"),
        Column::new("amortized_cost_amount", Double)
            .describe("Cost with upfront and recurring reservation fees spread over the period"),
        Column::new("amortized_cost_unit", String).describe("Unit type for amortized costs"),
        Column::new("net_amortized_cost_amount", Double)
            .describe("Amortized cost after all applicable discounts"),
        Column::new("net_amortized_cost_unit", String).describe("Unit type for net amortized costs"),
        Column::new("usage_quantity_amount", Double).describe("The amount of usage"),
        Column::new("usage_quantity_unit", String).describe("The unit of usage"),
        Column::new("normalized_usage_amount_amount", Double)
            .describe("Usage normalized across instance sizes"),
        Column::new("normalized_usage_amount_unit", String)
            .describe("The unit of normalized usage"),
    ]
}

// =============================================================================
// Request parameters
// =============================================================================

fn dimension(key: &str) -> Value {
    json!({ "Type": "DIMENSION", "Key": key })
}

fn cost_and_usage_params(ctx: &QueryContext, group_by: Vec<Value>) -> Result<Value> {
    let granularity = ctx.granularity()?;
    let window = cost_window(&granularity, ctx.now, &ctx.lookback)?;

    Ok(json!({
        "TimePeriod": window.to_json(),
        "Granularity": granularity.as_str(),
        "Metrics": COST_METRICS,
        "GroupBy": group_by,
    }))
}

fn by_account_params(ctx: &QueryContext) -> Result<Value> {
    cost_and_usage_params(ctx, vec![dimension("LINKED_ACCOUNT")])
}

fn by_service_params(ctx: &QueryContext) -> Result<Value> {
    cost_and_usage_params(ctx, vec![dimension("SERVICE")])
}

fn by_service_usage_type_params(ctx: &QueryContext) -> Result<Value> {
    cost_and_usage_params(ctx, vec![dimension("SERVICE"), dimension("USAGE_TYPE")])
}

fn by_tag_params(ctx: &QueryContext) -> Result<Value> {
    let tag_key = ctx.required("tag_key")?;
    cost_and_usage_params(ctx, vec![json!({ "Type": "TAG", "Key": tag_key })])
}

fn forecast_params(ctx: &QueryContext) -> Result<Value> {
    let granularity = ctx.granularity()?;
    let window = forecast_window(&granularity, ctx.now, &ctx.forecast)?;

    Ok(json!({
        "TimePeriod": window.to_json(),
        "Granularity": granularity.as_str(),
        "Metric": FORECAST_METRIC,
    }))
}

// =============================================================================
// Page mappers
// =============================================================================

/// One item per `(period, group)`; a period without groups yields its total
pub fn flatten_results_by_time(page: &Value) -> Vec<Value> {
    let Some(results) = page.get("ResultsByTime").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for result in results {
        match result.get("Groups").and_then(Value::as_array) {
            Some(groups) if !groups.is_empty() => {
                for group in groups {
                    items.push(cost_item(result, project(group, "Keys"), project(group, "Metrics")));
                }
            }
            _ => items.push(cost_item(result, &Value::Null, project(result, "Total"))),
        }
    }
    items
}

fn cost_item(result: &Value, keys: &Value, metrics: &Value) -> Value {
    let mut item = Map::new();
    item.insert("PeriodStart".into(), project(result, "TimePeriod.Start").clone());
    item.insert("PeriodEnd".into(), project(result, "TimePeriod.End").clone());
    item.insert("Estimated".into(), project(result, "Estimated").clone());
    item.insert("Dimension1".into(), project(keys, "0").clone());
    item.insert("Dimension2".into(), project(keys, "1").clone());

    for metric in COST_METRICS {
        let values = project(metrics, metric);
        item.insert(format!("{}Amount", metric), project(values, "Amount").clone());
        item.insert(format!("{}Unit", metric), project(values, "Unit").clone());
    }
    Value::Object(item)
}

fn flatten_forecast(page: &Value) -> Vec<Value> {
    let Some(results) = page.get("ForecastResultsByTime").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .map(|result| {
            json!({
                "PeriodStart": project(result, "TimePeriod.Start"),
                "PeriodEnd": project(result, "TimePeriod.End"),
                "MeanValue": project(result, "MeanValue"),
                "PredictionIntervalLowerBound": project(result, "PredictionIntervalLowerBound"),
                "PredictionIntervalUpperBound": project(result, "PredictionIntervalUpperBound"),
            })
        })
        .collect()
}

fn forecast_table() -> Table {
    use ColumnType::{Double, Timestamp};

    Table::new("aws_cost_forecast", "AWS Cost Explorer - Cost Forecast")
        .columns([
            Column::new("period_start", Timestamp).describe("Start timestamp for this forecast"),
            Column::new("period_end", Timestamp).describe("End timestamp for this forecast"),
            Column::new("mean_value", Double).describe("Average forecasted value"),
            Column::new("prediction_interval_lower_bound", Double)
                .describe("The lower limit for the prediction interval"),
            Column::new("prediction_interval_upper_bound", Double)
                .describe("The upper limit for the prediction interval"),
            granularity_column(),
        ])
        .columns(standard_columns())
        .list(ListConfig {
            key_columns: &["granularity"],
            call: ListCall {
                service: Service::CostExplorer,
                operation: "GetCostForecast",
                items: PageItems::Map(flatten_forecast),
                request_token: "NextPageToken",
                response_token: "NextPageToken",
            },
            params: forecast_params,
        })
        .hydrate(HydrateSource::key_quals(QUALS))
}
