//! Concurrent work load against a live server.

use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_concurrent_work_returns_gauge_to_zero() {
    let server = common::spawn_server(|_| {}).await;
    let client = common::client();

    let concurrency = 50;
    let start = Instant::now();
    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let client = client.clone();
        let url = server.url("/api/v1/work?ms=100&jitter=50");
        handles.push(tokio::spawn(async move {
            client.get(url).send().await.map(|res| res.status().as_u16())
        }));
    }

    let mut ok = 0;
    for handle in handles {
        if let Ok(Ok(200)) = handle.await {
            ok += 1;
        }
    }
    let elapsed = start.elapsed();

    println!("Completed {} work requests in {:?}", ok, elapsed);
    assert_eq!(ok, concurrency);
    // Work runs concurrently, not one after another.
    assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);

    assert!(common::wait_for_idle(&server.state, Duration::from_secs(1)).await);
    let metrics = client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("work_jobs_inflight 0"));
    assert!(metrics.contains(
        r#"http_requests_total{method="GET",route="/api/v1/work",status="200"} 50"#
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_abandoned_requests_release_gauge() {
    let server = common::spawn_server(|_| {}).await;
    let impatient = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = impatient.clone();
        let url = server.url("/api/v1/work?ms=1000");
        handles.push(tokio::spawn(async move { client.get(url).send().await }));
    }
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_err(), "client should have timed out");
    }

    // Whether the server notices the disconnect or lets the work finish,
    // the gauge must come back down.
    assert!(common::wait_for_idle(&server.state, Duration::from_secs(3)).await);
    assert_eq!(server.state.metrics.inflight_count(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_request_deadline_cancels_work() {
    let server = common::spawn_server(|config| config.timeouts.request_secs = 1).await;
    let client = common::client();

    let start = Instant::now();
    let res = client
        .get(server.url("/api/v1/work?ms=5000"))
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), 408);
    assert_eq!(res.text().await.unwrap(), "Work simulation cancelled");
    assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    assert!(server
        .state
        .metrics
        .render()
        .contains(r#"work_failures_total{operation="simulate_work"} 1"#));

    server.stop().await;
}
