//! CloudFront tables

use super::standard_columns;
use crate::aws::Service;
use crate::error::Result;
use crate::table::qualifier::QueryContext;
use crate::table::{
    Column, ColumnType, GetConfig, HydrateCall, HydrateSource, Identifiers, Identity, ListCall,
    ListConfig, PageItems, Table, Transform,
};
use serde_json::{json, Value};

const GET_DISTRIBUTION: &str = "get_distribution";
const LIST_TAGS: &str = "list_tags";

const NOT_FOUND: &[&str] = &["NoSuchDistribution"];

pub fn tables() -> Vec<Table> {
    vec![distribution_table()]
}

fn distribution_table() -> Table {
    use ColumnType::{Bool, Int, Json, String, Timestamp};

    Table::new("aws_cloudfront_distribution", "AWS CloudFront Distribution")
        .columns([
            Column::new("id", String).describe("The identifier for the distribution"),
            Column::new("enabled", Bool)
                .describe("Whether the distribution is enabled to accept user requests for content"),
            Column::new("e_tag", String)
                .describe("The current version of the distribution's information")
                .hydrate(GET_DISTRIBUTION),
            Column::new("status", String).describe("The current status of the distribution"),
            Column::new("last_modified_time", Timestamp)
                .describe("The date and time the distribution was last modified"),
            Column::new("domain_name", String)
                .describe("The domain name that corresponds to the distribution"),
            Column::new("tags_src", Json)
                .describe("A list of tags attached to the distribution")
                .hydrate_field(LIST_TAGS, "Tags.Items"),
            Column::new("comment", String).describe("The comment originally specified when this distribution was created"),
            Column::new("http_version", String)
                .describe("The maximum HTTP version that viewers use to communicate with CloudFront"),
            Column::new("is_ipv6_enabled", Bool)
                .describe("Whether CloudFront responds to IPv6 DNS requests")
                .field("IsIPV6Enabled"),
            Column::new("active_trusted_key_groups_enabled", Bool)
                .hydrate_field(GET_DISTRIBUTION, "Distribution.ActiveTrustedKeyGroups.Enabled"),
            Column::new("active_trusted_key_groups_items", Json)
                .hydrate_field(GET_DISTRIBUTION, "Distribution.ActiveTrustedKeyGroups.Items"),
            Column::new("active_trusted_key_groups_quantity", Int)
                .hydrate_field(GET_DISTRIBUTION, "Distribution.ActiveTrustedKeyGroups.Quantity"),
            Column::new("active_trusted_signers_enabled", Bool)
                .hydrate_field(GET_DISTRIBUTION, "Distribution.ActiveTrustedSigners.Enabled"),
            Column::new("active_trusted_signers_items", Json)
                .hydrate_field(GET_DISTRIBUTION, "Distribution.ActiveTrustedSigners.Items"),
            Column::new("active_trusted_signers_quantity", Int)
                .hydrate_field(GET_DISTRIBUTION, "Distribution.ActiveTrustedSigners.Quantity"),
            Column::new("price_class", String)
                .describe("The price class of the distribution"),
            Column::new("web_acl_id", String)
                .describe("The Web ACL associated with the distribution")
                .field("WebACLId"),
            Column::new("aliases_quantity", Int).field("Aliases.Quantity"),
            Column::new("aliases_items", Json).field("Aliases.Items"),
            Column::new("cache_behaviors_quantity", Int).field("CacheBehaviors.Quantity"),
            Column::new("cache_behaviors_items", Json).field("CacheBehaviors.Items"),
            Column::new("origins_quantity", Int).field("Origins.Quantity"),
            Column::new("origins_items", Json).field("Origins.Items"),
            Column::new("in_progress_invalidation_batches", Int)
                .describe("The number of invalidation batches currently in progress")
                .hydrate_field(GET_DISTRIBUTION, "Distribution.InProgressInvalidationBatches"),
            Column::new("title", String)
                .describe("Title of the resource")
                .field("Id"),
            Column::new("tags", Json)
                .describe("A map of tags for the resource")
                .hydrate_field(LIST_TAGS, "Tags.Items")
                .transform(Transform::tags()),
            Column::new("akas", Json)
                .describe("Array of globally unique identifier strings (also known as) for the resource")
                .field("ARN")
                .transform(Transform::ArnToAkas),
        ])
        .columns(standard_columns())
        .list(ListConfig {
            key_columns: &[],
            call: ListCall {
                service: Service::CloudFront,
                operation: "ListDistributions",
                items: PageItems::Path("DistributionList.Items"),
                request_token: "Marker",
                response_token: "DistributionList.NextMarker",
            },
            params: |_| Ok(json!({})),
        })
        .get(GetConfig {
            key_columns: &["id"],
            service: Service::CloudFront,
            operation: "GetDistribution",
            params: get_params,
            not_found: NOT_FOUND,
            ignore_not_found: true,
            satisfies: Some(GET_DISTRIBUTION),
        })
        .identity(Identity {
            id_path: "Id",
            arn_path: Some("ARN"),
            detail_root: Some("Distribution"),
        })
        .hydrate(HydrateSource::call(
            GET_DISTRIBUTION,
            HydrateCall {
                service: Service::CloudFront,
                operation: "GetDistribution",
                params: |ids| Some(json!({ "Id": ids.id })),
                result_path: None,
                not_found: NOT_FOUND,
            },
        ))
        .hydrate(HydrateSource::call(
            LIST_TAGS,
            HydrateCall {
                service: Service::CloudFront,
                operation: "ListTagsForResource",
                params: tags_params,
                result_path: None,
                not_found: &["NoSuchResource", "NoSuchDistribution"],
            },
        ))
}

fn get_params(ctx: &QueryContext) -> Result<Value> {
    Ok(json!({ "Id": ctx.required("id")? }))
}

fn tags_params(ids: &Identifiers) -> Option<Value> {
    ids.arn.as_ref().map(|arn| json!({ "Resource": arn }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::test_support::context;

    #[test]
    fn test_tags_need_an_arn() {
        let ids = Identifiers {
            id: "E1".into(),
            arn: None,
        };
        assert_eq!(tags_params(&ids), None);

        let ids = Identifiers {
            id: "E1".into(),
            arn: Some("arn:aws:cloudfront::123:distribution/E1".into()),
        };
        assert_eq!(
            tags_params(&ids),
            Some(json!({"Resource": "arn:aws:cloudfront::123:distribution/E1"}))
        );
    }

    #[test]
    fn test_get_params() {
        let ctx = context("aws_cloudfront_distribution", &[("id", "E1")]);
        assert_eq!(get_params(&ctx).unwrap(), json!({"Id": "E1"}));
    }

    #[test]
    fn test_etag_and_tags_share_sources() {
        let table = distribution_table();
        assert_eq!(table.column("e_tag").unwrap().source_path(), "ETag");
        assert_eq!(table.column("tags").unwrap().hydrate_source(), Some(LIST_TAGS));
        assert_eq!(table.column("tags_src").unwrap().hydrate_source(), Some(LIST_TAGS));
    }
}
