//! Example: print the pause sequence of a strategy
//!
//! Shows the default strategy next to one with a longer base delay and a
//! higher ceiling. Jitter is on, so the numbers change between runs.
//!
//! Run with:
//! ```bash
//! cargo run -p rebound-core --example pauses
//! ```

use rebound_core::prelude::*;
use std::time::Duration;

fn print_sequence(label: &str, strategy: &mut ExponentialBackoff) {
    println!("{label}");
    for attempt in 0..10 {
        println!(
            "  attempt {attempt}: {:?} (nominal {:?})",
            strategy.pause(attempt),
            strategy.unjittered(attempt)
        );
    }
}

fn main() -> Result<(), ConfigError> {
    let mut defaults = ExponentialBackoff::default();
    print_sequence("Default strategy (1s base, 180s max):", &mut defaults);

    let mut slower = ExponentialBackoff::builder()
        .base_delay(Duration::from_secs(2))
        .max_delay(Duration::from_secs(300))
        .build()?;
    print_sequence("\n2s base, 300s max:", &mut slower);

    Ok(())
}
