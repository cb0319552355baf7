//! Minimal retry-only example.
use persevere::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Failure<std::io::Error>> {
    let policy = RetryPolicy::builder()
        .max_attempts(3)
        .backoff(
            Backoff::exponential(Duration::from_millis(200))
                .with_max(Duration::from_secs(2))
                .expect("valid backoff cap"),
        )
        .with_jitter(Jitter::full())
        .build()
        .expect("valid retry policy");

    let value = RetryExecutor::new()
        .run(&policy, || async {
            // Replace with your real fallible work
            Ok::<_, AttemptError<std::io::Error>>("hello from retry")
        })
        .await
        .into_result()?;

    println!("{}", value);
    Ok(())
}
