use mock_service::EventConfig;
use stampede::prelude::*;
use stampede::types::FailReason;
use stampede_tests::{init, token_file, MockEvent};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60_000)]
async fn single_winner() {
    init();
    let event = MockEvent::start(EventConfig::new(1)).await.unwrap();
    let tokens = token_file(150).unwrap();

    let result = RaceScenario::http(event.config(150, &tokens))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(result.total, 150);
    assert_eq!(result.accepted, 1);
    assert_eq!(result.rejected, 149);
    assert_eq!(result.failed, 0);
    assert!(result.is_pass(), "{result}");
    assert_eq!(event.state.requests(), 150);
    assert_eq!(event.state.stock(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60_000)]
async fn limited_stock() {
    init();
    let event = MockEvent::start(EventConfig::new(10).delay(Duration::from_millis(5)))
        .await
        .unwrap();
    let tokens = token_file(80).unwrap();

    let result = RaceScenario::http(event.config(80, &tokens))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(result.accepted, 10);
    assert_eq!(result.rejected, 70);
    assert!(result.is_pass(), "{result}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60_000)]
async fn hanging_client_fails_the_run() {
    init();
    let event = MockEvent::start(EventConfig::new(1).hang_on("token-37"))
        .await
        .unwrap();
    let tokens = token_file(60).unwrap();

    let result = RaceScenario::http(event.config(60, &tokens))
        .unwrap()
        .duration(Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(result.total, 60);
    assert_eq!(result.failed, 1);
    assert_eq!(result.failures.timeout, 1);
    assert_eq!(result.accepted, 1);
    assert_eq!(result.rejected, 58);
    assert_eq!(
        result.verdict,
        Verdict::Fail(vec![FailReason::UnexpectedFailures { count: 1 }])
    );
    assert!(!result.is_pass());
    assert!(result.latency.max() >= Duration::from_secs(2));
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn insufficient_pool_sends_no_traffic() {
    init();
    let event = MockEvent::start(EventConfig::new(1)).await.unwrap();
    let tokens = token_file(49).unwrap();

    let err = RaceScenario::http(event.config(50, &tokens))
        .unwrap()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RaceError::InsufficientPool {
            required: 50,
            available: 49
        }
    ));
    assert_eq!(event.state.requests(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(30_000)]
async fn conflicts_outside_expected_set_fail() {
    init();
    let event = MockEvent::start(EventConfig::new(1)).await.unwrap();
    let tokens = token_file(20).unwrap();

    let mut config = event.config(20, &tokens);
    config.rejected = StatusSet::from([429]);

    let result = RaceScenario::http(config).unwrap().await.unwrap();

    assert_eq!(result.accepted, 1);
    assert_eq!(result.failures.unexpected_status, 19);
    assert!(!result.is_pass());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(30_000)]
async fn slow_server_fails_latency_threshold() {
    init();
    let event = MockEvent::start(EventConfig::new(1).delay(Duration::from_millis(300)))
        .await
        .unwrap();
    let tokens = token_file(20).unwrap();

    let mut config = event.config(20, &tokens);
    config.latency = "p(95)<100ms".parse().unwrap();

    let result = RaceScenario::http(config).unwrap().await.unwrap();

    assert_eq!(result.failed, 0);
    assert!(result.observed >= Duration::from_millis(300));
    assert!(matches!(
        result.verdict,
        Verdict::Fail(ref reasons)
            if matches!(reasons.as_slice(), [FailReason::LatencyExceeded { .. }])
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(60_000)]
async fn repeated_race_needs_a_reset() {
    init();
    let event = MockEvent::start(EventConfig::new(1)).await.unwrap();
    let tokens = token_file(30).unwrap();

    let first = RaceScenario::http(event.config(30, &tokens))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(first.accepted, 1);

    // Everyone has already applied, so every caller is turned away.
    let second = RaceScenario::http(event.config(30, &tokens))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(second.accepted, 0);
    assert_eq!(second.rejected, 30);
    assert!(second.is_pass());

    let res = reqwest::Client::new()
        .post(format!("http://{}/api/admin/event/stock", event.addr))
        .json(&serde_json::json!({ "stock": 1 }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let third = RaceScenario::http(event.config(30, &tokens))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(third.accepted, 1);
    assert_eq!(third.rejected, 29);
}
