use axum::http::StatusCode;
use sheetwise::WorkspaceError;
use sheetwise::config::GatewayConfig;
use sheetwise::gateway::Gateway;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn config(per_minute: u32, per_day: u64, max_retries: usize) -> GatewayConfig {
    GatewayConfig {
        requests_per_minute: per_minute,
        requests_per_day: per_day,
        max_retries,
        initial_delay_ms: 100,
        max_delay_ms: 150,
        courtesy_delay_ms: 0,
        ..GatewayConfig::default()
    }
}

fn upstream(status: StatusCode) -> WorkspaceError {
    WorkspaceError::Upstream {
        status,
        message: "mock".to_string(),
        reason: None,
    }
}

#[tokio::test(start_paused = true)]
async fn retryable_failures_stop_after_max_retries() {
    let gateway = Gateway::new(&config(1_000, 10_000, 3));
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let started = Instant::now();
    let result = gateway
        .execute(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(upstream(StatusCode::SERVICE_UNAVAILABLE))
            }
        })
        .await;
    let elapsed = started.elapsed();

    assert_eq!(calls.load(Ordering::SeqCst), 4, "first attempt plus three retries");
    let err = result.expect_err("every attempt failed");
    assert_eq!(err.code(), "RETRIES_EXHAUSTED");
    assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    match err {
        WorkspaceError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("unexpected error: {other:?}"),
    }

    // 100ms, then capped at 150ms twice.
    assert!(elapsed >= Duration::from_millis(400), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(450), "elapsed {elapsed:?}");

    gateway.cleanup().await;
}

#[tokio::test(start_paused = true)]
async fn non_retryable_failures_are_attempted_once() {
    let gateway = Gateway::new(&config(1_000, 10_000, 3));
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let err = gateway
        .execute(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(upstream(StatusCode::BAD_REQUEST))
            }
        })
        .await
        .expect_err("bad request");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.code(), "UPSTREAM_ERROR");
    assert!(matches!(err, WorkspaceError::Upstream { .. }));

    gateway.cleanup().await;
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success_returns_value() {
    let gateway = Gateway::new(&config(1_000, 10_000, 3));
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let value = gateway
        .execute(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(upstream(StatusCode::TOO_MANY_REQUESTS))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .expect("third attempt succeeds");

    assert_eq!(value, "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    gateway.cleanup().await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_day_fails_without_calling_upstream() {
    let gateway = Gateway::new(&config(1_000, 2, 3));
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let counter = calls.clone();
        gateway
            .execute(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .expect("within daily quota");
    }

    let counter = calls.clone();
    let err = gateway
        .execute(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .expect_err("daily quota exhausted");

    assert_eq!(err.code(), "RATE_LIMIT_EXCEEDED");
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = gateway.stats();
    assert_eq!(stats.day_count, 2);
    assert_eq!(stats.daily_remaining, 0);

    gateway.cleanup().await;
}

#[tokio::test(start_paused = true)]
async fn full_minute_delays_instead_of_failing() {
    let gateway = Gateway::new(&config(2, 10_000, 0));
    let started = Instant::now();

    for _ in 0..3 {
        gateway
            .execute(|| async { Ok(()) })
            .await
            .expect("per-minute limit only delays");
    }

    assert!(
        started.elapsed() >= Duration::from_secs(60),
        "third call waited for the window to roll"
    );
    assert_eq!(gateway.stats().day_count, 3);
    gateway.cleanup().await;
}

#[tokio::test(start_paused = true)]
async fn requests_settle_in_submission_order() {
    let gateway = Gateway::new(&config(1_000, 10_000, 0));
    let order = Arc::new(Mutex::new(Vec::new()));

    let calls = (0..5).map(|i| {
        let order = order.clone();
        gateway.execute(move || {
            let order = order.clone();
            async move {
                // Earlier requests take longer; a concurrent worker would reorder them.
                tokio::time::sleep(Duration::from_millis(50 - i * 10)).await;
                order.lock().unwrap().push(i);
                Ok(i)
            }
        })
    });
    let results = futures::future::join_all(calls).await;

    let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    gateway.cleanup().await;
}

#[tokio::test(start_paused = true)]
async fn cleanup_drains_queue_then_rejects_new_work() {
    let gateway = Arc::new(Gateway::new(&config(1_000, 10_000, 0)));
    let done = Arc::new(AtomicUsize::new(0));

    let pending = {
        let gateway = gateway.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let calls = (0..3).map(|_| {
                let done = done.clone();
                gateway.execute(move || {
                    let done = done.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        done.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
            });
            futures::future::join_all(calls).await
        })
    };

    // Let the spawned task enqueue all three.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    gateway.cleanup().await;
    assert!(gateway.is_closed());
    assert_eq!(done.load(Ordering::SeqCst), 3, "queued work settled before cleanup returned");

    let results = pending.await.expect("join");
    assert!(results.iter().all(Result::is_ok));

    let err = gateway
        .execute(|| async { Ok(()) })
        .await
        .expect_err("closed gateway");
    assert_eq!(err.code(), "GATEWAY_CLOSED");
}
