//! Batch of records against a flaky upstream: validation rejections fail fast, transient
//! errors back off and retry, and the report keeps one result per record in input order.
use persevere::prelude::*;
use persevere::telemetry::LogSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Record {
    id: Option<u32>,
    name: &'static str,
    email: Option<&'static str>,
    balance: i64,
}

struct Enriched {
    id: u32,
    display_name: String,
}

fn validate(record: &Record) -> Result<u32, AttemptError<String>> {
    let id = record.id.ok_or_else(|| AttemptError::validation("id", "ID required"))?;
    match record.email {
        None => return Err(AttemptError::validation("email", "Email required")),
        Some(email) if !email.contains('@') => {
            return Err(AttemptError::validation("email", "Invalid email format"))
        }
        Some(_) => {}
    }
    if record.balance < 0 {
        return Err(AttemptError::business("INSUFFICIENT_BALANCE", "Balance cannot be negative"));
    }
    Ok(id)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let records = vec![
        Record { id: Some(1), name: "Ana", email: Some("ana@example.com"), balance: 120 },
        Record { id: None, name: "Carlos", email: Some("carlos@example.com"), balance: 40 },
        Record { id: Some(3), name: "Maria", email: Some("maria.example.com"), balance: 10 },
        Record { id: Some(4), name: "Luis", email: Some("luis@example.com"), balance: -5 },
        Record { id: Some(5), name: "Sofia", email: Some("sofia@example.com"), balance: 75 },
    ];

    let policy = PolicyConfig::from_json(
        r#"{ "max_attempts": 3, "base_delay_ms": 100, "delay_multiplier": 2.0 }"#,
    )
    .and_then(|config| Ok(config.into_policy()?))
    .expect("valid retry policy");

    // Every other upstream call fails with a transient error.
    let upstream_calls = Arc::new(AtomicUsize::new(0));
    let runner = BatchRunner::new(RetryExecutor::new().with_sink(LogSink)).with_concurrency(2);

    let report = runner
        .run_all(
            records,
            |record| {
                let upstream_calls = upstream_calls.clone();
                move || {
                    let record = record.clone();
                    let upstream_calls = upstream_calls.clone();
                    async move {
                        let id = validate(&record)?;
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        if upstream_calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                            return Err(AttemptError::retryable("upstream API error".to_string()));
                        }
                        Ok::<_, AttemptError<String>>(Enriched {
                            id,
                            display_name: record.name.to_uppercase(),
                        })
                    }
                }
            },
            &policy,
        )
        .await;

    for (index, result) in report.results.iter().enumerate() {
        match result {
            CallResult::Ok { value, attempts } => println!(
                "#{index}: ok id={} name={} after {attempts} attempt(s)",
                value.id, value.display_name
            ),
            CallResult::Err { failure, attempts } => {
                println!("#{index}: failed after {attempts} attempt(s): {failure}")
            }
        }
    }
    println!(
        "total={} succeeded={} failed={} retries={} success_rate={:.1}% elapsed={:?}",
        report.stats.total,
        report.stats.succeeded,
        report.stats.failed,
        report.stats.total_retries,
        report.stats.success_rate(),
        report.elapsed
    );
}
