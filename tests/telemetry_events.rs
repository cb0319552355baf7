use persevere::telemetry::{BatchEvent, MemorySink, PolicyEvent, RetryEvent, TelemetrySink};
use persevere::{AttemptError, BatchRunner, BatchStats, InstantSleeper, RetryExecutor, RetryPolicy};
use std::future::{ready, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("sink offline")]
struct SinkOffline;

/// Counts deliveries and rejects every one of them.
#[derive(Clone, Default)]
struct FailingSink {
    delivered: Arc<AtomicUsize>,
}

impl tower::Service<PolicyEvent> for FailingSink {
    type Response = ();
    type Error = SinkOffline;
    type Future = Ready<Result<(), SinkOffline>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: PolicyEvent) -> Self::Future {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        ready(Err(SinkOffline))
    }
}

impl TelemetrySink for FailingSink {
    type SinkError = SinkOffline;
}

#[tokio::test]
async fn retry_events_follow_the_attempts() {
    let sink = MemorySink::new();
    let executor = RetryExecutor::new().with_sleeper(InstantSleeper).with_sink(sink.clone());
    let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0).expect("policy");

    let result = executor
        .run(&policy, || async { Err::<(), _>(AttemptError::retryable("down")) })
        .await;
    assert_eq!(result.attempts(), 3);

    let events = sink.events();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        PolicyEvent::Retry(RetryEvent::Attempt { attempt: 2, delay: Duration::from_millis(100) })
    );
    assert_eq!(
        events[1],
        PolicyEvent::Retry(RetryEvent::Attempt { attempt: 3, delay: Duration::from_millis(200) })
    );
    assert!(matches!(
        events[2],
        PolicyEvent::Retry(RetryEvent::Exhausted { total_attempts: 3, .. })
    ));
}

#[tokio::test]
async fn rejection_emits_single_event() {
    let sink = MemorySink::new();
    let executor = RetryExecutor::new().with_sleeper(InstantSleeper).with_sink(sink.clone());
    let policy = RetryPolicy::new(5, Duration::from_millis(10), 1.0).expect("policy");

    let _ = executor
        .run(&policy, || async {
            Err::<(), AttemptError<String>>(AttemptError::business("NEGATIVE_BALANCE", "balance < 0"))
        })
        .await;

    assert_eq!(sink.events(), vec![PolicyEvent::Retry(RetryEvent::Rejected { attempt: 1 })]);
}

#[tokio::test]
async fn batch_brackets_element_events() {
    let sink = MemorySink::new();
    let runner =
        BatchRunner::new(RetryExecutor::new().with_sleeper(InstantSleeper).with_sink(sink.clone()));
    let policy = RetryPolicy::new(2, Duration::from_millis(10), 1.0).expect("policy");

    let report = runner
        .run_all(
            [true, false],
            |ok| move || async move {
                if ok {
                    Ok(())
                } else {
                    Err(AttemptError::retryable("flaky".to_string()))
                }
            },
            &policy,
        )
        .await;

    let events = sink.events();
    assert_eq!(events.first(), Some(&PolicyEvent::Batch(BatchEvent::Started { total: 2 })));
    let expected = BatchStats { total: 2, succeeded: 1, failed: 1, total_retries: 1, cancelled: 0 };
    assert_eq!(report.stats, expected);
    assert_eq!(
        events.last(),
        Some(&PolicyEvent::Batch(BatchEvent::Completed { stats: expected, elapsed: report.elapsed }))
    );
    assert!(events.contains(&PolicyEvent::Retry(RetryEvent::Attempt {
        attempt: 2,
        delay: Duration::from_millis(10),
    })));
}

#[tokio::test]
async fn cancelled_elements_emit_cancel_events() {
    let sink = MemorySink::new();
    let runner =
        BatchRunner::new(RetryExecutor::new().with_sleeper(InstantSleeper).with_sink(sink.clone()));
    runner.executor().cancel();
    let policy = RetryPolicy::default();

    let _ = runner
        .run_all(0..3, |_| || async { Ok::<_, AttemptError<String>>(()) }, &policy)
        .await;

    let cancelled = sink
        .events()
        .into_iter()
        .filter(|e| *e == PolicyEvent::Retry(RetryEvent::Cancelled { attempts: 0 }))
        .count();
    assert_eq!(cancelled, 3);
}

#[tokio::test(start_paused = true)]
async fn cancelled_pause_records_no_attempt() {
    let sink = MemorySink::new();
    let executor = RetryExecutor::new().with_sink(sink.clone());
    let token = executor.cancellation_token().clone();
    let policy = RetryPolicy::new(3, Duration::from_secs(60), 1.0).expect("policy");

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let result = executor
        .run(&policy, || async { Err::<(), _>(AttemptError::retryable("down")) })
        .await;
    canceller.await.expect("canceller");

    assert_eq!(result.attempts(), 1);
    assert_eq!(sink.events(), vec![PolicyEvent::Retry(RetryEvent::Cancelled { attempts: 1 })]);
}

#[tokio::test]
async fn failing_custom_sink_never_fails_the_batch() {
    let sink = FailingSink::default();
    let runner =
        BatchRunner::new(RetryExecutor::new().with_sleeper(InstantSleeper).with_sink(sink.clone()));
    let policy = RetryPolicy::new(2, Duration::from_millis(10), 1.0).expect("policy");

    let report = runner
        .run_all(
            [1, 2],
            |n| move || async move {
                if n == 1 {
                    Ok(n)
                } else {
                    Err(AttemptError::retryable("flaky".to_string()))
                }
            },
            &policy,
        )
        .await;

    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.failed, 1);
    // started, attempt #2, exhausted, completed
    assert_eq!(sink.delivered.load(Ordering::SeqCst), 4);
}
