//! Behavioural tests covering fleet provisioning and log tailing together.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use flotilla::fleet::{Fleet, FleetError};
use flotilla::logs::{DEFAULT_FOLLOW_COMMAND, LogTailer};
use flotilla::retry::Backoff;
use flotilla::test_support::{ExecStep, ScriptedExec, ScriptedProvider};

fn fleet(provider: &Arc<ScriptedProvider>) -> Fleet<ScriptedProvider> {
    Fleet::new(Arc::clone(provider), "flotilla")
}

#[tokio::test]
async fn provisioning_ten_nodes_returns_all_of_them_in_order() {
    let provider = Arc::new(ScriptedProvider::new());
    let nodes = fleet(&provider).start(10).await.expect("all creations succeed");

    assert_eq!(nodes.len(), 10);
    let names: Vec<&str> = nodes.iter().map(|node| node.name.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|index| format!("flotilla-{index:02}")).collect();
    assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn partial_failure_reports_survivors_and_the_loss_ratio() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.fail_creation("flotilla-02");
    provider.fail_creation("flotilla-05");
    provider.fail_creation("flotilla-08");

    let err = fleet(&provider).start(10).await.expect_err("three creations fail");

    assert_eq!(err.to_string(), "3/10 nodes were not created");
    let FleetError::Partial { nodes, .. } = err else {
        panic!("expected partial failure, got {err:?}");
    };
    assert_eq!(nodes.len(), 7);
    assert!(nodes.iter().all(|node| {
        node.name != "flotilla-02" && node.name != "flotilla-05" && node.name != "flotilla-08"
    }));
}

#[tokio::test]
async fn negative_counts_never_reach_the_provider() {
    let provider = Arc::new(ScriptedProvider::new());
    let result = fleet(&provider).start(-1).await;

    assert!(matches!(result, Err(FleetError::Validation { count: -1 })));
    assert!(provider.create_calls().is_empty());
}

#[tokio::test]
async fn zero_count_is_an_empty_success() {
    let provider = Arc::new(ScriptedProvider::new());
    let nodes = fleet(&provider).start(0).await.expect("empty fleet");
    assert!(nodes.is_empty());
}

#[tokio::test]
async fn a_provisioned_node_can_be_tailed_through_retries() {
    let provider = Arc::new(ScriptedProvider::new());
    let nodes = fleet(&provider).start(1).await.expect("one node");
    let node = nodes.first().expect("one node");

    // The node's log sink is not up yet: the first two attempts fail
    // transiently before output flows.
    let client = Arc::new(ScriptedExec::new());
    client.push_transient_failures(2);
    client.push(ExecStep::Succeed(vec![b"booted\n".to_vec()]));

    let backoff = Backoff::new(
        Duration::from_millis(2),
        Duration::from_millis(10),
        1.5,
    );
    let tailer = LogTailer::new(Arc::clone(&client), DEFAULT_FOLLOW_COMMAND, backoff);
    let stream = tailer.tail(node, CancellationToken::new());
    let (data, status) = stream.collect().await;

    assert_eq!(data, b"booted\n");
    assert_eq!(status, Ok(()));
    assert_eq!(client.attempt_count(), 3);
    // The tail targets the host embedded in the node's address.
    let attempts = client.attempts();
    let (host, command) = attempts.first().expect("at least one attempt");
    assert_eq!(host, "flotilla-00.internal");
    assert_eq!(command, DEFAULT_FOLLOW_COMMAND);
}

#[tokio::test]
async fn retiring_the_fleet_removes_only_its_own_nodes() {
    let provider = Arc::new(ScriptedProvider::new());
    fleet(&provider).start(2).await.expect("two nodes");
    provider.set_listing(vec![
        String::from("flotilla-00"),
        String::from("flotilla-01"),
        String::from("bastion"),
    ]);

    let deleted = fleet(&provider).retire_all().await.expect("teardown succeeds");

    assert_eq!(deleted, 2);
    assert_eq!(provider.deleted(), vec!["flotilla-00", "flotilla-01"]);
}
