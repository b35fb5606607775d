//! Route 53 tables

use super::standard_columns;
use crate::aws::Service;
use crate::error::Result;
use crate::table::qualifier::QueryContext;
use crate::table::{
    Column, ColumnType, GetConfig, HydrateCall, HydrateSource, Identifiers, Identity, ListCall,
    ListConfig, PageItems, Table, Transform,
};
use serde_json::{json, Value};

const LIST_TAGS: &str = "list_tags";

/// Hosted zones have no ARN in API responses
const AKA_PREFIX: &str = "arn:aws:route53:::";

pub fn tables() -> Vec<Table> {
    vec![zone_table()]
}

fn zone_table() -> Table {
    use ColumnType::{Bool, Int, Json, String};

    Table::new("aws_route53_zone", "AWS Route53 Hosted Zone")
        .columns([
            Column::new("name", String).describe("The name of the domain"),
            Column::new("id", String).describe("The ID that Amazon Route 53 assigned to the hosted zone"),
            Column::new("caller_reference", String)
                .describe("The value specified for CallerReference when the hosted zone was created"),
            Column::new("resource_record_set_count", Int)
                .describe("The number of resource record sets in the hosted zone"),
            Column::new("comment", String)
                .describe("Any comments included about the hosted zone")
                .field("HostedZoneConfig.Comment"),
            Column::new("private_zone", Bool)
                .describe("Whether the hosted zone is private")
                .field("HostedZoneConfig.PrivateZone"),
            Column::new("linked_service_principal", String)
                .describe("The service that created the hosted zone, if any")
                .field("LinkedService.ServicePrincipal"),
            Column::new("linked_service_description", String)
                .field("LinkedService.Description"),
            Column::new("tags_src", Json)
                .describe("A list of tags attached to the hosted zone")
                .hydrate_field(LIST_TAGS, "Tags"),
            Column::new("tags", Json)
                .describe("A map of tags for the resource")
                .hydrate_field(LIST_TAGS, "Tags")
                .transform(Transform::tags()),
            Column::new("title", String)
                .describe("Title of the resource")
                .field("Name"),
            Column::new("akas", Json)
                .describe("Array of globally unique identifier strings (also known as) for the resource")
                .field("Name")
                .transform(Transform::NameToAkas { prefix: AKA_PREFIX }),
        ])
        .columns(standard_columns())
        .list(ListConfig {
            key_columns: &[],
            call: ListCall {
                service: Service::Route53,
                operation: "ListHostedZones",
                items: PageItems::Path("HostedZones"),
                request_token: "Marker",
                response_token: "NextMarker",
            },
            params: |_| Ok(json!({})),
        })
        .get(GetConfig {
            key_columns: &["id"],
            service: Service::Route53,
            operation: "GetHostedZone",
            params: get_params,
            not_found: &["NoSuchHostedZone", "InvalidParameterValue", "InvalidInput"],
            ignore_not_found: true,
            satisfies: None,
        })
        .identity(Identity {
            id_path: "Id",
            arn_path: None,
            detail_root: Some("HostedZone"),
        })
        .hydrate(HydrateSource::call(
            LIST_TAGS,
            HydrateCall {
                service: Service::Route53,
                operation: "ListTagsForResource",
                params: tags_params,
                result_path: Some("ResourceTagSet"),
                not_found: &["NoSuchHostedZone"],
            },
        ))
}

fn get_params(ctx: &QueryContext) -> Result<Value> {
    Ok(json!({ "Id": ctx.required("id")? }))
}

/// `/hostedzone/Z123` and `Z123` both name the same zone
fn zone_id(id: &str) -> &str {
    id.strip_prefix("/hostedzone/").unwrap_or(id)
}

fn tags_params(ids: &Identifiers) -> Option<Value> {
    Some(json!({
        "ResourceType": "hostedzone",
        "ResourceId": zone_id(&ids.id),
    }))
}
