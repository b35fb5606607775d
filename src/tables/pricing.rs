//! Price List tables

use super::standard_columns;
use crate::aws::Service;
use crate::error::Result;
use crate::table::qualifier::QueryContext;
use crate::table::{
    Column, ColumnType, GetConfig, Identity, ListCall, ListConfig, PageItems, Table, Transform,
};
use serde_json::{json, Value};

pub fn tables() -> Vec<Table> {
    vec![service_table(), product_table()]
}

fn service_table() -> Table {
    Table::new("aws_pricing_service", "AWS Pricing Service")
        .columns([
            Column::new("service_code", ColumnType::String)
                .describe("The code for the AWS service"),
            Column::new("attribute_names", ColumnType::Json)
                .describe("The attributes that are available for this service"),
            Column::new("title", ColumnType::String)
                .describe("Title of the resource")
                .field("ServiceCode"),
        ])
        .columns(standard_columns())
        .list(ListConfig {
            key_columns: &[],
            call: ListCall {
                service: Service::Pricing,
                operation: "DescribeServices",
                items: PageItems::Path("Services"),
                request_token: "NextToken",
                response_token: "NextToken",
            },
            params: |_| Ok(json!({})),
        })
        .get(GetConfig {
            key_columns: &["service_code"],
            service: Service::Pricing,
            operation: "DescribeServices",
            params: service_get_params,
            not_found: &["NotFoundException"],
            ignore_not_found: true,
            satisfies: None,
        })
        .identity(Identity {
            id_path: "ServiceCode",
            arn_path: None,
            detail_root: Some("Services.0"),
        })
}

fn service_get_params(ctx: &QueryContext) -> Result<Value> {
    Ok(json!({ "ServiceCode": ctx.required("service_code")? }))
}

/// `(column, attribute key)` for the string-typed product attributes
const PRODUCT_ATTRIBUTES: &[(&str, &str)] = &[
    ("memory", "memory"),
    ("storage", "storage"),
    ("location", "location"),
    ("operation", "operation"),
    ("usage_type", "usagetype"),
    ("clock_speed", "clockSpeed"),
    ("service_name", "servicename"),
    ("instance_type", "instanceType"),
    ("license_model", "licenseModel"),
    ("location_type", "locationType"),
    ("instance_family", "instanceFamily"),
    ("current_generation", "currentGeneration"),
    ("physical_processor", "physicalProcessor"),
    ("processor_features", "processorFeatures"),
    ("network_performance", "networkPerformance"),
    ("processor_architecture", "processorArchitecture"),
    // usually numeric, sometimes "NA"
    ("normalization_size_factor", "normalizationSizeFactor"),
    // usually numeric, sometimes "Variable"
    ("ecu", "ecu"),
    ("tenancy", "tenancy"),
    ("capacity_status", "capacitystatus"),
    ("pre_installed_sw", "preInstalledSw"),
    ("operating_system", "operatingSystem"),
    ("intel_avx_available", "intelAvxAvailable"),
    ("intel_avx2_available", "intelAvx2Available"),
    ("intel_turbo_available", "intelTurboAvailable"),
    ("dedicated_ebs_throughput", "dedicatedEbsThroughput"),
    ("enhanced_networking_supported", "enhancedNetworkingSupported"),
    ("engine_code", "engineCode"),
    ("database_engine", "databaseEngine"),
    ("database_edition", "databaseEdition"),
    ("deployment_option", "deploymentOption"),
    ("instance_type_family", "instanceTypeFamily"),
];

fn product_table() -> Table {
    let mut columns = vec![
        Column::new("service_code", ColumnType::String)
            .describe("The code for the AWS service")
            .field("serviceCode"),
        Column::new("publication_date", ColumnType::Timestamp)
            .describe("When the price list entry was published")
            .field("publicationDate")
            .transform(Transform::NullIfZero),
        Column::new("version", ColumnType::String)
            .describe("Version of the price list entry")
            .field("version"),
        Column::new("sku", ColumnType::String)
            .describe("The product SKU")
            .field("product.sku"),
        Column::new("product_family", ColumnType::String)
            .describe("The product family, e.g. Compute Instance")
            .field("product.productFamily"),
        Column::new("vcpu", ColumnType::Int)
            .describe("Number of virtual CPUs")
            .field("product.attributes.vcpu"),
    ];

    columns.extend(PRODUCT_ATTRIBUTES.iter().map(|&(name, key)| {
        Column::new(name, ColumnType::String)
            .field("product.attributes")
            .transform(Transform::Field(key))
    }));

    columns.extend([
        Column::new("attributes", ColumnType::Json)
            .describe("All product attributes")
            .field("product.attributes"),
        Column::new("terms", ColumnType::Json)
            .describe("On-demand and reserved pricing terms")
            .field("terms"),
    ]);

    Table::new("aws_pricing_product", "AWS Pricing Product")
        .columns(columns)
        .columns(standard_columns())
        .list(ListConfig {
            key_columns: &["service_code", "instance_type"],
            call: ListCall {
                service: Service::Pricing,
                operation: "GetProducts",
                items: PageItems::EncodedPath("PriceList"),
                request_token: "NextToken",
                response_token: "NextToken",
            },
            params: product_list_params,
        })
        .identity(Identity {
            id_path: "product.sku",
            arn_path: None,
            detail_root: None,
        })
}

fn product_list_params(ctx: &QueryContext) -> Result<Value> {
    let service_code = ctx.required("service_code")?;
    let instance_type = ctx.required("instance_type")?;

    Ok(json!({
        "ServiceCode": service_code,
        "FormatVersion": "aws_v1",
        "Filters": [{
            "Field": "instanceType",
            "Type": "TERM_MATCH",
            "Value": instance_type,
        }],
    }))
}
