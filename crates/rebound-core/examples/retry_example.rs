//! Example: driving a flaky operation with the retry driver
//!
//! This example demonstrates:
//! 1. Retrying until success with exponential backoff
//! 2. Stopping early on an error that retrying won't fix
//! 3. Canceling a retry sequence from another task
//!
//! Run with:
//! ```bash
//! RUST_LOG=rebound_core=debug cargo run -p rebound-core --example retry_example
//! ```

use rebound_core::prelude::*;
use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated service that fails the first few times
struct UnreliableApi {
    attempts: AtomicU32,
    fail_count: u32,
}

impl UnreliableApi {
    fn new(fail_count: u32) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            fail_count,
        }
    }

    async fn call(&self) -> io::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_count {
            println!("  Attempt {}: FAILED (simulating transient error)", attempt + 1);
            Err(io::Error::other(format!("transient error on attempt {}", attempt + 1)))
        } else {
            println!("  Attempt {}: SUCCESS", attempt + 1);
            Ok(())
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn quick_backoff() -> Result<ExponentialBackoff, ConfigError> {
    ExponentialBackoff::builder()
        .base_delay(Duration::from_millis(100))
        .max_delay(Duration::from_secs(2))
        .factor(2.0)
        .jitter(0.0)
        .build()
}

/// Example 1: retry until the service recovers
async fn example_simple_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Retry Until Success ===\n");

    let api = UnreliableApi::new(3);
    let start = Instant::now();

    RetryDriver::new(quick_backoff()?)
        .run(|_| {
            let api = &api;
            async move { Outcome::from(api.call().await) }
        })
        .await?;

    println!("\nTotal attempts: {}", api.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: 100ms + 200ms + 400ms = ~700ms");

    Ok(())
}

/// Example 2: give up on errors retrying won't fix
async fn example_fatal_error() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Fatal Error Stops Immediately ===\n");

    let result = RetryDriver::new(quick_backoff()?)
        .run(|attempt| async move {
            let err = io::Error::new(io::ErrorKind::PermissionDenied, "auth failed");
            println!("  Attempt {}: {}", attempt + 1, err);
            Outcome::stop(err)
        })
        .await;

    match result {
        Err(RetryError::Operation(err)) => println!("Gave up with: {err}"),
        other => println!("Unexpected: {other:?}"),
    }

    Ok(())
}

/// Example 3: cancel while the driver is waiting
async fn example_cancellation() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Cancellation ===\n");

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        println!("  Canceling...");
        canceller.cancel();
    });

    let start = Instant::now();
    let result = retry(quick_backoff()?, &token, |attempt| async move {
        println!("  Attempt {}: still down", attempt + 1);
        Outcome::retry(io::Error::other("service unavailable"))
    })
    .await;

    println!(
        "Result after {:?}: {}",
        start.elapsed(),
        result.map_or_else(|e| e.to_string(), |_| "ok".to_string())
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("==============================================");
    println!("   rebound: Retry Driver Examples");
    println!("==============================================");

    example_simple_retry().await?;
    example_fatal_error().await?;
    example_cancellation().await?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
