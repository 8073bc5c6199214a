//! Tempora
//!
//! Prints a one-shot synchronization report for the default town against
//! the current time (or `TEMPORA_REFERENCE`, an "HH:MM" string).

use anyhow::Context;
use tempora::clock::{current_time, ClockRegistry};
use tempora::config::Config;
use tempora::display::render_report;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tempora=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load_default();

    let reference = std::env::var("TEMPORA_REFERENCE")
        .ok()
        .or_else(|| config.sync.reference_time.clone())
        .unwrap_or_else(|| current_time(config.sync.utc_offset_minutes).to_string());

    let mut registry = ClockRegistry::with_default_clocks()
        .with_tolerance(config.sync.tolerance_minutes);
    registry
        .set_reference_time(&reference)
        .with_context(|| format!("invalid reference time {:?}", reference))?;

    println!("Starting Tempora Clock Synchronization System...\n");
    let report = registry.analyze(true);
    print!("{}", render_report(&report, &registry.recommendations_per_clock()));

    for clock in registry.out_of_sync(config.sync.alert_tolerance) {
        println!(
            "⚠️ ALERT: {} is out of sync by {} minutes!",
            clock.name, clock.absolute_difference
        );
    }

    Ok(())
}
