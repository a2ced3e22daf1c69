//! Tests for fleet provisioning fan-out, aggregation, and teardown.

use std::sync::Arc;

use rstest::rstest;

use super::{Fleet, FleetError};
use crate::test_support::ScriptedProvider;

fn fleet(provider: &Arc<ScriptedProvider>) -> Fleet<ScriptedProvider> {
    Fleet::new(Arc::clone(provider), "flotilla")
}

#[rstest]
#[case(0, "flotilla-00")]
#[case(7, "flotilla-07")]
#[case(12, "flotilla-12")]
#[case(123, "flotilla-123")]
fn node_names_are_zero_padded_to_two_digits(#[case] index: usize, #[case] expected: &str) {
    let provider = Arc::new(ScriptedProvider::new());
    assert_eq!(fleet(&provider).node_name(index), expected);
}

#[tokio::test]
async fn negative_count_fails_validation_without_provider_calls() {
    let provider = Arc::new(ScriptedProvider::new());
    let result = fleet(&provider).start(-3).await;

    assert!(
        matches!(result, Err(FleetError::Validation { count: -3 })),
        "unexpected result: {result:?}"
    );
    assert!(provider.create_calls().is_empty());
}

#[tokio::test]
async fn zero_count_succeeds_with_an_empty_fleet() {
    let provider = Arc::new(ScriptedProvider::new());
    let nodes = fleet(&provider).start(0).await.unwrap();

    assert!(nodes.is_empty());
    assert!(provider.create_calls().is_empty());
}

#[tokio::test]
async fn full_success_returns_nodes_in_request_order() {
    let provider = Arc::new(ScriptedProvider::new());
    let nodes = fleet(&provider).start(4).await.unwrap();

    let names: Vec<&str> = nodes.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["flotilla-00", "flotilla-01", "flotilla-02", "flotilla-03"]
    );
    assert_eq!(
        nodes.first().map(|node| node.address.as_str()),
        Some(ScriptedProvider::address_for("flotilla-00").as_str())
    );
}

#[tokio::test]
async fn every_requested_creation_is_attempted() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.fail_creation("flotilla-01");
    let _result = fleet(&provider).start(5).await;

    let mut calls = provider.create_calls();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            "flotilla-00",
            "flotilla-01",
            "flotilla-02",
            "flotilla-03",
            "flotilla-04"
        ]
    );
}

#[tokio::test]
async fn partial_failure_carries_the_surviving_nodes() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.fail_creation("flotilla-01");
    provider.fail_creation("flotilla-03");

    let result = fleet(&provider).start(5).await;
    let Err(FleetError::Partial {
        nodes,
        failed,
        requested,
    }) = result
    else {
        panic!("expected partial failure, got {result:?}");
    };

    assert_eq!(failed, 2);
    assert_eq!(requested, 5);
    let names: Vec<&str> = nodes.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(names, vec!["flotilla-00", "flotilla-02", "flotilla-04"]);
}

#[tokio::test]
async fn partial_failure_reports_the_failed_over_requested_ratio() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.fail_creation("flotilla-00");
    provider.fail_creation("flotilla-02");

    let err = fleet(&provider).start(3).await.unwrap_err();
    assert_eq!(err.to_string(), "2/3 nodes were not created");
}

#[tokio::test]
async fn total_failure_still_reports_partial_with_no_survivors() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.fail_creation("flotilla-00");
    provider.fail_creation("flotilla-01");

    let result = fleet(&provider).start(2).await;
    let Err(FleetError::Partial { nodes, failed, .. }) = result else {
        panic!("expected partial failure, got {result:?}");
    };
    assert!(nodes.is_empty());
    assert_eq!(failed, 2);
}

#[tokio::test]
async fn retire_all_deletes_only_prefixed_nodes() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.set_listing(vec![
        String::from("flotilla-00"),
        String::from("unrelated-vm"),
        String::from("flotilla-01"),
        String::from("flotillafake"),
    ]);

    let deleted = fleet(&provider).retire_all().await.unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(provider.deleted(), vec!["flotilla-00", "flotilla-01"]);
}

#[tokio::test]
async fn retire_all_continues_past_deletion_failures() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.set_listing(vec![
        String::from("flotilla-00"),
        String::from("flotilla-01"),
        String::from("flotilla-02"),
    ]);
    provider.fail_deletion("flotilla-01");

    let result = fleet(&provider).retire_all().await;

    assert!(
        matches!(
            result,
            Err(FleetError::Teardown {
                failed: 1,
                attempted: 3
            })
        ),
        "unexpected result: {result:?}"
    );
    assert_eq!(provider.deleted(), vec!["flotilla-00", "flotilla-02"]);
}

#[tokio::test]
async fn retire_all_with_no_matching_nodes_deletes_nothing() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.set_listing(vec![String::from("other-00")]);

    let deleted = fleet(&provider).retire_all().await.unwrap();

    assert_eq!(deleted, 0);
    assert!(provider.deleted().is_empty());
}
