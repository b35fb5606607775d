//! Integration tests for the query engine against a scripted transport
//!
//! Each test scripts provider replies per operation, runs a query through
//! the real table declarations and asserts on the rows and on the calls the
//! engine made.

mod common;

use awsq::aws::Service;
use awsq::table::{
    ColumnValue, QueryRequest, QuerySettings, Qualifier, Qualifiers, Row, TransformErrorPolicy,
};
use awsq::Error;
use common::{engine, engine_with, fixed_now, MockTransport};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

fn quals(pairs: &[(&str, &str)]) -> Qualifiers {
    pairs
        .iter()
        .fold(Qualifiers::new(), |acc, (col, val)| acc.with(Qualifier::eq(col, *val)))
}

fn string(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn sequential() -> QuerySettings {
    QuerySettings {
        hydrate_concurrency: 1,
        ..QuerySettings::default()
    }
}

/// Run a query to completion at the fixed test clock
async fn run(
    engine: &awsq::table::QueryEngine,
    request: QueryRequest,
) -> Result<Vec<Row>, Error> {
    let mut stream = engine.execute_at(request, fixed_now())?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next().await {
        rows.push(row?);
    }
    Ok(rows)
}

mod cost_tests {
    use super::*;

    fn account_page(accounts: &[&str], next: Option<&str>) -> serde_json::Value {
        let groups: Vec<_> = accounts
            .iter()
            .map(|a| {
                json!({
                    "Keys": [a],
                    "Metrics": {"UnblendedCost": {"Amount": "10.25", "Unit": "USD"}}
                })
            })
            .collect();
        let mut page = json!({
            "ResultsByTime": [{
                "TimePeriod": {"Start": "2024-04-01", "End": "2024-05-01"},
                "Estimated": false,
                "Groups": groups
            }]
        });
        if let Some(token) = next {
            page["NextPageToken"] = json!(token);
        }
        page
    }

    /// Two pages grouped by linked account yield one row per group
    #[tokio::test]
    async fn test_cost_by_account_across_two_pages() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::CostExplorer, "GetCostAndUsage", account_page(&["111111111111"], Some("p2")))
            .respond(Service::CostExplorer, "GetCostAndUsage", account_page(&["222222222222"], None));

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_cost_by_account")
            .columns(["linked_account_id", "granularity"])
            .qualifiers(quals(&[("granularity", "MONTHLY")]));

        let rows = run(&engine, request).await.unwrap();

        let accounts: Vec<_> = rows.iter().filter_map(|r| string(r, "linked_account_id")).collect();
        assert_eq!(accounts, vec!["111111111111", "222222222222"]);
        for row in &rows {
            assert_eq!(string(row, "granularity").as_deref(), Some("MONTHLY"));
            assert_eq!(row.len(), 2);
        }

        let requests = transport.requests_to("GetCostAndUsage");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["GroupBy"][0]["Key"], "LINKED_ACCOUNT");
        assert!(requests[0].get("NextPageToken").is_none());
        assert_eq!(requests[1]["NextPageToken"], "p2");
    }

    /// Lowercase granularity is normalised in both the request and the rows
    #[tokio::test]
    async fn test_granularity_is_uppercased() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Service::CostExplorer, "GetCostAndUsage", account_page(&["1"], None));

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_cost_by_service")
            .columns(["service", "granularity", "unblended_cost_amount"])
            .qualifiers(quals(&[("granularity", "daily")]));

        let rows = run(&engine, request).await.unwrap();
        assert_eq!(string(&rows[0], "granularity").as_deref(), Some("DAILY"));
        assert_eq!(rows[0].get("unblended_cost_amount"), Some(&ColumnValue::Double(10.25)));
        assert_eq!(transport.requests_to("GetCostAndUsage")[0]["Granularity"], "DAILY");
    }

    /// Missing granularity fails before any provider call
    #[tokio::test]
    async fn test_missing_granularity_makes_no_calls() {
        let transport = Arc::new(MockTransport::new());
        let engine = engine(Arc::clone(&transport));

        let result = engine.execute_at(QueryRequest::new("aws_cost_by_account"), fixed_now());
        assert!(matches!(
            result,
            Err(Error::MissingRequiredFilter { ref column, .. }) if column == "granularity"
        ));
        assert_eq!(transport.call_count(), 0);
    }

    /// Parsed key qualifiers reach the request as typed by the caller
    #[tokio::test]
    async fn test_tag_key_sent_verbatim() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Service::CostExplorer, "GetCostAndUsage", json!({"ResultsByTime": []}));

        let qualifiers = ["granularity=MONTHLY", "tag_key=007"]
            .iter()
            .map(|q| q.parse::<Qualifier>().unwrap())
            .fold(Qualifiers::new(), Qualifiers::with);

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_cost_by_tag").qualifiers(qualifiers);
        let rows = run(&engine, request).await.unwrap();

        assert!(rows.is_empty());
        assert_eq!(
            transport.requests_to("GetCostAndUsage")[0]["GroupBy"],
            json!([{"Type": "TAG", "Key": "007"}])
        );
    }

    /// Tag costs need both key qualifiers
    #[tokio::test]
    async fn test_cost_by_tag_requires_tag_key() {
        let transport = Arc::new(MockTransport::new());
        let engine = engine(Arc::clone(&transport));

        let request = QueryRequest::new("aws_cost_by_tag").qualifiers(quals(&[("granularity", "MONTHLY")]));
        let result = engine.execute_at(request, fixed_now());
        assert!(matches!(
            result,
            Err(Error::MissingRequiredFilter { ref column, .. }) if column == "tag_key"
        ));
        assert_eq!(transport.call_count(), 0);
    }
}

mod pagination_tests {
    use super::*;

    fn zones(ids: &[&str], next: Option<&str>) -> serde_json::Value {
        let zones: Vec<_> = ids
            .iter()
            .map(|id| json!({"Id": format!("/hostedzone/{}", id), "Name": format!("{}.example.com.", id)}))
            .collect();
        match next {
            Some(marker) => json!({"HostedZones": zones, "NextMarker": marker}),
            None => json!({"HostedZones": zones}),
        }
    }

    /// All pages are read in order and an empty page does not end the stream
    #[tokio::test]
    async fn test_pages_followed_in_order() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::Route53, "ListHostedZones", zones(&["A", "B"], Some("m2")))
            .respond(Service::Route53, "ListHostedZones", zones(&[], Some("m3")))
            .respond(Service::Route53, "ListHostedZones", zones(&["C"], None));

        let engine = engine(Arc::clone(&transport));
        let rows = run(&engine, QueryRequest::new("aws_route53_zone").columns(["id"]))
            .await
            .unwrap();

        let ids: Vec<_> = rows.iter().filter_map(|r| string(r, "id")).collect();
        assert_eq!(ids, vec!["/hostedzone/A", "/hostedzone/B", "/hostedzone/C"]);

        let requests = transport.requests_to("ListHostedZones");
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1]["Marker"], "m2");
        assert_eq!(requests[2]["Marker"], "m3");
    }

    /// Stopping after the first row leaves later pages unfetched
    #[tokio::test]
    async fn test_early_stop_fetches_no_more_pages() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::Route53, "ListHostedZones", zones(&["A"], Some("m2")))
            .respond(Service::Route53, "ListHostedZones", zones(&["B"], Some("m3")))
            .respond(Service::Route53, "ListHostedZones", zones(&["C"], None));

        let engine = engine(Arc::clone(&transport));
        let rows = engine
            .collect(QueryRequest::new("aws_route53_zone").columns(["id", "name"]), Some(1))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(transport.calls_to("ListHostedZones"), 1);
    }

    /// A provider error ends the stream after being reported once
    #[tokio::test]
    async fn test_error_mid_pagination_ends_stream() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::Route53, "ListHostedZones", zones(&["A"], Some("m2")))
            .fail(Service::Route53, "ListHostedZones", 400, "Throttling");

        let engine = engine(Arc::clone(&transport));
        let mut stream = engine
            .execute_at(QueryRequest::new("aws_route53_zone").columns(["id"]), fixed_now())
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Transport(ref e) if e.code.as_deref() == Some("Throttling")));
        assert!(stream.next().await.is_none());
        assert_eq!(transport.calls_to("ListHostedZones"), 2);
    }
}

mod hydration_tests {
    use super::*;

    fn distribution(id: &str) -> serde_json::Value {
        json!({
            "Id": id,
            "ARN": format!("arn:aws:cloudfront::123456789012:distribution/{}", id),
            "Status": "Deployed",
            "Enabled": true,
            "DomainName": format!("{}.cloudfront.net", id.to_lowercase()),
            "Aliases": {"Quantity": 0}
        })
    }

    fn detail(id: &str, etag: &str) -> serde_json::Value {
        json!({
            "ETag": etag,
            "Distribution": {
                "Id": id,
                "ARN": format!("arn:aws:cloudfront::123456789012:distribution/{}", id),
                "Status": "Deployed",
                "InProgressInvalidationBatches": 0,
                "ActiveTrustedSigners": {"Enabled": false, "Quantity": 0}
            }
        })
    }

    fn list(ids: &[&str]) -> serde_json::Value {
        let items: Vec<_> = ids.iter().map(|id| distribution(id)).collect();
        json!({"DistributionList": {"Items": items}})
    }

    /// Several columns from one source trigger one call per item
    #[tokio::test]
    async fn test_shared_source_called_once_per_item() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::CloudFront, "ListDistributions", list(&["E1", "E2"]))
            .respond(Service::CloudFront, "GetDistribution", detail("E1", "etag-1"))
            .respond(Service::CloudFront, "GetDistribution", detail("E2", "etag-2"));

        let engine = engine_with(Arc::clone(&transport), sequential());
        let request = QueryRequest::new("aws_cloudfront_distribution").columns([
            "id",
            "e_tag",
            "active_trusted_signers_enabled",
            "in_progress_invalidation_batches",
        ]);
        let rows = run(&engine, request).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(string(&rows[0], "e_tag").as_deref(), Some("etag-1"));
        assert_eq!(string(&rows[1], "e_tag").as_deref(), Some("etag-2"));
        assert_eq!(rows[0].get("active_trusted_signers_enabled"), Some(&ColumnValue::Bool(false)));
        assert_eq!(rows[0].get("in_progress_invalidation_batches"), Some(&ColumnValue::Int(0)));
        assert_eq!(transport.calls_to("GetDistribution"), 2);
    }

    /// Repeated identities in one query share the cached result
    #[tokio::test]
    async fn test_duplicate_identity_hydrated_once() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::CloudFront, "ListDistributions", list(&["E1", "E1"]))
            .respond(Service::CloudFront, "GetDistribution", detail("E1", "etag-1"));

        let engine = engine_with(Arc::clone(&transport), sequential());
        let rows = run(
            &engine,
            QueryRequest::new("aws_cloudfront_distribution").columns(["id", "e_tag"]),
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(transport.calls_to("GetDistribution"), 1);
    }

    /// Overlapping hydrations of one identity share a single call
    #[tokio::test]
    async fn test_concurrent_duplicates_share_one_call() {
        let transport = Arc::new(MockTransport::new().yielding(4));
        transport
            .respond(Service::CloudFront, "ListDistributions", list(&["E1", "E1", "E1", "E1"]))
            .respond(Service::CloudFront, "GetDistribution", detail("E1", "etag-1"));

        let engine = engine(Arc::clone(&transport));
        assert!(engine.settings().hydrate_concurrency > 1);

        let rows = run(
            &engine,
            QueryRequest::new("aws_cloudfront_distribution").columns(["id", "e_tag"]),
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 4);
        assert!(rows
            .iter()
            .all(|r| string(r, "e_tag").as_deref() == Some("etag-1")));
        assert_eq!(transport.calls_to("GetDistribution"), 1);
    }

    /// Columns not backed by a source make no follow-up calls
    #[tokio::test]
    async fn test_base_columns_skip_hydration() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Service::CloudFront, "ListDistributions", list(&["E1"]));

        let engine = engine(Arc::clone(&transport));
        let rows = run(
            &engine,
            QueryRequest::new("aws_cloudfront_distribution").columns(["id", "enabled", "akas", "title"]),
        )
        .await
        .unwrap();

        assert_eq!(transport.call_count(), 1);
        assert_eq!(rows[0].get("enabled"), Some(&ColumnValue::Bool(true)));
        assert_eq!(
            rows[0].get("akas"),
            Some(&ColumnValue::Json(json!(["arn:aws:cloudfront::123456789012:distribution/E1"])))
        );
        assert_eq!(string(&rows[0], "title").as_deref(), Some("E1"));
    }

    /// An entity gone between list and hydrate drops only its row
    #[tokio::test]
    async fn test_not_found_during_hydration_drops_row() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::CloudFront, "ListDistributions", list(&["E1", "E2"]))
            .fail(Service::CloudFront, "GetDistribution", 404, "NoSuchDistribution")
            .respond(Service::CloudFront, "GetDistribution", detail("E2", "etag-2"));

        let engine = engine_with(Arc::clone(&transport), sequential());
        let rows = run(
            &engine,
            QueryRequest::new("aws_cloudfront_distribution").columns(["id", "e_tag"]),
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(string(&rows[0], "id").as_deref(), Some("E2"));
    }

    /// Any other hydration failure fails the query
    #[tokio::test]
    async fn test_generic_hydration_failure_is_fatal() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::CloudFront, "ListDistributions", list(&["E1"]))
            .fail(Service::CloudFront, "GetDistribution", 403, "AccessDenied");

        let engine = engine(Arc::clone(&transport));
        let result = run(
            &engine,
            QueryRequest::new("aws_cloudfront_distribution").columns(["id", "e_tag"]),
        )
        .await;

        assert!(matches!(result, Err(Error::Transport(ref e)) if e.status == Some(403)));
    }

    /// The get path already carries the detail, so no second GetDistribution
    #[tokio::test]
    async fn test_get_satisfies_detail_source() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(Service::CloudFront, "GetDistribution", detail("E1", "etag-1"))
            .respond(
                Service::CloudFront,
                "ListTagsForResource",
                json!({"Tags": {"Items": [{"Key": "team", "Value": "web"}]}}),
            );

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_cloudfront_distribution")
            .columns(["id", "status", "e_tag", "tags"])
            .qualifiers(quals(&[("id", "E1")]));
        let rows = run(&engine, request).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(string(&rows[0], "id").as_deref(), Some("E1"));
        assert_eq!(string(&rows[0], "status").as_deref(), Some("Deployed"));
        assert_eq!(string(&rows[0], "e_tag").as_deref(), Some("etag-1"));
        assert_eq!(rows[0].get("tags"), Some(&ColumnValue::Json(json!({"team": "web"}))));
        assert_eq!(transport.calls_to("GetDistribution"), 1);
        assert_eq!(transport.calls_to("ListDistributions"), 0);

        let tag_requests = transport.requests_to("ListTagsForResource");
        assert_eq!(
            tag_requests[0]["Resource"],
            "arn:aws:cloudfront::123456789012:distribution/E1"
        );
    }

    /// Untagged and tagged-with-nothing stay distinguishable
    #[tokio::test]
    async fn test_route53_tags() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond(
                Service::Route53,
                "ListHostedZones",
                json!({"HostedZones": [
                    {"Id": "/hostedzone/Z1", "Name": "a.example."},
                    {"Id": "/hostedzone/Z2", "Name": "b.example."}
                ]}),
            )
            .respond(
                Service::Route53,
                "ListTagsForResource",
                json!({"ResourceTagSet": {"ResourceId": "Z1", "Tags": [
                    {"Key": "env", "Value": "dev"},
                    {"Key": "env", "Value": "prod"}
                ]}}),
            )
            .respond(
                Service::Route53,
                "ListTagsForResource",
                json!({"ResourceTagSet": {"ResourceId": "Z2", "Tags": []}}),
            );

        let engine = engine_with(Arc::clone(&transport), sequential());
        let rows = run(
            &engine,
            QueryRequest::new("aws_route53_zone").columns(["id", "tags", "akas"]),
        )
        .await
        .unwrap();

        assert_eq!(rows[0].get("tags"), Some(&ColumnValue::Json(json!({"env": "prod"}))));
        assert_eq!(rows[1].get("tags"), Some(&ColumnValue::Json(json!({}))));
        assert_eq!(
            rows[0].get("akas"),
            Some(&ColumnValue::Json(json!(["arn:aws:route53:::a.example."])))
        );

        let tag_requests = transport.requests_to("ListTagsForResource");
        assert_eq!(tag_requests[0]["ResourceId"], "Z1");
        assert_eq!(tag_requests[0]["ResourceType"], "hostedzone");
    }
}

mod get_tests {
    use super::*;

    /// Ignorable not-found on the get path yields no rows
    #[tokio::test]
    async fn test_get_not_found_is_empty() {
        let transport = Arc::new(MockTransport::new());
        transport.fail(Service::Route53, "GetHostedZone", 404, "NoSuchHostedZone");

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_route53_zone")
            .columns(["id", "name"])
            .qualifiers(quals(&[("id", "/hostedzone/ZNOPE")]));
        let rows = run(&engine, request).await.unwrap();

        assert!(rows.is_empty());
        assert_eq!(transport.calls_to("GetHostedZone"), 1);
        assert_eq!(transport.calls_to("ListHostedZones"), 0);
    }

    /// Get reads base columns from the detail root
    #[tokio::test]
    async fn test_get_hosted_zone() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Service::Route53,
            "GetHostedZone",
            json!({
                "HostedZone": {
                    "Id": "/hostedzone/Z1",
                    "Name": "example.com.",
                    "CallerReference": "ref-1",
                    "ResourceRecordSetCount": 4,
                    "Config": {},
                    "HostedZoneConfig": {"Comment": "main", "PrivateZone": false}
                },
                "DelegationSet": {"NameServers": ["ns-1.awsdns.com"]}
            }),
        );

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_route53_zone")
            .columns(["name", "resource_record_set_count", "comment", "private_zone", "region"])
            .qualifiers(quals(&[("id", "/hostedzone/Z1")]));
        let rows = run(&engine, request).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(string(&rows[0], "name").as_deref(), Some("example.com."));
        assert_eq!(rows[0].get("resource_record_set_count"), Some(&ColumnValue::Int(4)));
        assert_eq!(string(&rows[0], "comment").as_deref(), Some("main"));
        assert_eq!(rows[0].get("private_zone"), Some(&ColumnValue::Bool(false)));
        assert_eq!(string(&rows[0], "region").as_deref(), Some("us-east-1"));
        assert_eq!(transport.requests_to("GetHostedZone")[0]["Id"], "/hostedzone/Z1");
    }

    /// Pricing service lookup unwraps the single-entry list
    #[tokio::test]
    async fn test_pricing_service_get() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Service::Pricing,
            "DescribeServices",
            json!({"Services": [{"ServiceCode": "AmazonEC2", "AttributeNames": ["instanceType"]}]}),
        );

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_pricing_service")
            .columns(["service_code", "title", "attribute_names"])
            .qualifiers(quals(&[("service_code", "AmazonEC2")]));
        let rows = run(&engine, request).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(string(&rows[0], "title").as_deref(), Some("AmazonEC2"));
        assert_eq!(
            rows[0].get("attribute_names"),
            Some(&ColumnValue::Json(json!(["instanceType"])))
        );
    }

    /// An empty lookup result is an empty query result
    #[tokio::test]
    async fn test_pricing_service_get_empty() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Service::Pricing, "DescribeServices", json!({"Services": []}));

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_pricing_service")
            .qualifiers(quals(&[("service_code", "Nope")]));
        assert!(run(&engine, request).await.unwrap().is_empty());
    }
}

mod transform_tests {
    use super::*;

    fn zone_with_bad_count() -> serde_json::Value {
        json!({"HostedZones": [{"Id": "/hostedzone/Z1", "Name": "a.", "ResourceRecordSetCount": "lots"}]})
    }

    /// By default a bad value nulls its column and keeps the row
    #[tokio::test]
    async fn test_bad_value_nulls_column() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Service::Route53, "ListHostedZones", zone_with_bad_count());

        let engine = engine(Arc::clone(&transport));
        let rows = run(
            &engine,
            QueryRequest::new("aws_route53_zone").columns(["id", "resource_record_set_count"]),
        )
        .await
        .unwrap();

        assert_eq!(rows[0].get("resource_record_set_count"), Some(&ColumnValue::Null));
        assert_eq!(string(&rows[0], "id").as_deref(), Some("/hostedzone/Z1"));
    }

    /// With the fail policy the query reports the column
    #[tokio::test]
    async fn test_bad_value_fails_query() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Service::Route53, "ListHostedZones", zone_with_bad_count());

        let settings = QuerySettings {
            transform_errors: TransformErrorPolicy::Fail,
            ..QuerySettings::default()
        };
        let engine = engine_with(Arc::clone(&transport), settings);
        let result = run(
            &engine,
            QueryRequest::new("aws_route53_zone").columns(["id", "resource_record_set_count"]),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::Transform { ref column, .. }) if column == "resource_record_set_count"
        ));
    }

    /// Price List entries arrive JSON-encoded and are decoded per item
    #[tokio::test]
    async fn test_pricing_products_decoded() {
        let product = json!({
            "serviceCode": "AmazonEC2",
            "version": "20240501",
            "publicationDate": "2024-05-01T00:00:00Z",
            "product": {
                "sku": "SKU1",
                "productFamily": "Compute Instance",
                "attributes": {"instanceType": "m5.large", "vcpu": "2", "usagetype": "BoxUsage:m5.large"}
            },
            "terms": {"OnDemand": {}}
        });
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Service::Pricing,
            "GetProducts",
            json!({"PriceList": [product.to_string()], "FormatVersion": "aws_v1"}),
        );

        let engine = engine(Arc::clone(&transport));
        let request = QueryRequest::new("aws_pricing_product")
            .columns(["sku", "vcpu", "usage_type", "instance_type", "publication_date"])
            .qualifiers(quals(&[("service_code", "AmazonEC2"), ("instance_type", "m5.large")]));
        let rows = run(&engine, request).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(string(&rows[0], "sku").as_deref(), Some("SKU1"));
        assert_eq!(rows[0].get("vcpu"), Some(&ColumnValue::Int(2)));
        assert_eq!(string(&rows[0], "usage_type").as_deref(), Some("BoxUsage:m5.large"));
        assert!(matches!(rows[0].get("publication_date"), Some(ColumnValue::Timestamp(_))));
    }

    /// Unknown columns are rejected up front
    #[tokio::test]
    async fn test_unknown_column() {
        let transport = Arc::new(MockTransport::new());
        let engine = engine(Arc::clone(&transport));
        let result = engine.execute_at(
            QueryRequest::new("aws_route53_zone").columns(["nope"]),
            fixed_now(),
        );
        assert!(matches!(result, Err(Error::UnknownColumn { .. })));
        assert_eq!(transport.call_count(), 0);
    }
}
