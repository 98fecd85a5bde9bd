//! Basic Usage Example
//!
//! Demonstrates building and logging annotated error reports:
//! - Plain std errors versus reports with locations
//! - Hints and details for troubleshooting
//! - Structured logging with rich error fields

use std::io;

use faultline::{kv, logx, Report, ResultExt};

// ==================== Std vs Report ====================

/// Example 1: Rendering a plain std error and a report
fn example_std_vs_report() {
    println!("\n=== Example 1: std::error::Error vs Report ===");

    let err = io::Error::new(io::ErrorKind::TimedOut, "connection timeout");
    println!("std error: {}", err);
    println!("std error debug: {:?}", err);

    let report = Report::new(io::Error::new(io::ErrorKind::TimedOut, "connection timeout"))
        .wrap("database connection failed");
    println!("report: {}", report);
    println!("report verbose:\n{:#}", report);
}

// ==================== Logging ====================

fn perform_database_operation(should_fail: bool) -> Result<(), Report> {
    if should_fail {
        let err = Report::msg("query execution failed")
            .with_hint("Check if the database is accessible")
            .with_detail(format!("query={} timeout={}ms", "SELECT * FROM users", 5000));
        return Err(err).wrap_err("failed to fetch user data");
    }
    Ok(())
}

/// Example 2: error_err extracts message, location, hints and details
fn example_error_err() {
    println!("\n=== Example 2: Structured logging with error_err ===");

    if let Err(err) = perform_database_operation(true) {
        logx::error_err(
            "Database operation failed",
            &err,
            kv! { "user_id" => 12345, "operation" => "fetch_user_data" },
        );
    }
}

/// Example 3: Enriching an error on its way up
fn example_enrichment() {
    println!("\n=== Example 3: Creating errors with context ===");

    let err = Report::msg("insufficient balance")
        .with_hint("User needs to deposit more funds")
        .with_detail(format!("balance={} required={}", 100, 500))
        .wrap("payment processing failed");

    logx::error_err(
        "Payment failed",
        &err,
        kv! { "payment_id" => "pay_123", "amount" => 500 },
    );
}

fn main() {
    logx::init(&logx::LogConfig::from_env());

    println!("======================================");
    println!("        Basic Usage Example           ");
    println!("======================================");

    example_std_vs_report();
    example_error_err();
    example_enrichment();

    println!("\n=== Summary ===");
    println!("1. Caller locations captured on creation and wrapping");
    println!("2. Hints for troubleshooting");
    println!("3. Structured details");
    println!("4. One JSON record per log call");
}
