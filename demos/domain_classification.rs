//! Domain Classification Example
//!
//! Demonstrates how domains and temporary/permanent marks drive retries:
//! - Temporary exchange and database errors are retried with backoff
//! - Permanent errors stop after a single attempt
//! - Domains tell which layer an error came from

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use faultline::classify::{is_permanent, mark_temporary};
use faultline::domain::{self, get_domain, new_exchange_error, wrap_with_domain, wrap_with_stack};
use faultline::retry::retry_with_backoff;
use faultline::{kv, logx, Report};

// ==================== Simulated services ====================

/// Exchange client that fails twice, then recovers.
struct ExchangeApi {
    calls: AtomicU32,
}

impl ExchangeApi {
    fn fetch_price(&self, symbol: &str) -> Result<f64, Report> {
        if symbol == "INVALID" {
            return Err(new_exchange_error("INVALID_SYMBOL", "symbol not found", false));
        }
        match self.calls.fetch_add(1, Ordering::SeqCst) + 1 {
            1 => Err(new_exchange_error("NETWORK_ERROR", "connection timeout", true)),
            2 => Err(new_exchange_error("RATE_LIMIT", "too many requests", true)),
            _ => Ok(50_000.0),
        }
    }
}

/// Database whose pool is exhausted on the first save.
struct DatabaseService {
    saves: AtomicU32,
}

impl DatabaseService {
    fn save_price(&self, _symbol: &str, _price: f64) -> Result<(), Report> {
        if self.saves.fetch_add(1, Ordering::SeqCst) > 0 {
            return Ok(());
        }
        let err = mark_temporary(Report::msg("connection pool exhausted"))
            .with_domain(domain::ADAPTERS)
            .with_hint("Database connection pool is full, retry after a short delay");
        Err(wrap_with_stack(err, "failed to save price to database"))
    }
}

struct PriceService {
    api: ExchangeApi,
    db: DatabaseService,
}

impl PriceService {
    async fn update_price(&self, symbol: &str) -> Result<(), Report> {
        let price = self
            .api
            .fetch_price(symbol)
            .map_err(|err| wrap_with_domain(err, "failed to update price", domain::USECASE))?;

        self.db
            .save_price(symbol, price)
            .map_err(|err| wrap_with_domain(err, "failed to persist price", domain::USECASE))?;

        logx::info(
            "Price updated successfully",
            kv! { "symbol" => symbol, "price" => price },
        );
        Ok(())
    }
}

// ==================== Examples ====================

/// Example 1: Temporary errors are retried
async fn example_retry_temporary(svc: &PriceService) {
    println!("\n=== Example 1: Retrying temporary errors ===");

    let result = retry_with_backoff(
        move || svc.update_price("BTC/USD"),
        5,
        Duration::from_millis(500),
    )
    .await;

    match result {
        Ok(()) => println!("Final result: price updated successfully"),
        Err(err) => logx::error_err("Final result: failed to update price", &err, kv! {}),
    }
}

/// Example 2: Permanent errors are not retried
async fn example_permanent(svc: &PriceService) {
    println!("\n=== Example 2: Permanent error (no retry) ===");

    let result = retry_with_backoff(
        move || svc.update_price("INVALID"),
        5,
        Duration::from_millis(500),
    )
    .await;

    if let Err(err) = result {
        logx::error_err("Final result: failed with permanent error", &err, kv! {});

        println!("Error domain: {:?}", get_domain(&err).map(|d| d.name()));
        if is_permanent(&err) {
            println!("This error is permanent and should not be retried");
        }
    }
}

/// Example 3: Domains identify the failing layer
fn example_domains() {
    println!("\n=== Example 3: Domain-based error classification ===");

    let usecase_err = Report::msg("business logic validation failed").with_domain(domain::USECASE);
    let adapter_err = Report::msg("database query failed").with_domain(domain::ADAPTERS);
    let exchange_err = new_exchange_error("API_ERROR", "exchange API failed", true);

    for (label, err) in [
        ("Usecase", &usecase_err),
        ("Adapter", &adapter_err),
        ("Exchange", &exchange_err),
    ] {
        match get_domain(err) {
            Some(domain) => println!("{} error domain: {}", label, domain),
            None => println!("{} error domain: none", label),
        }
    }
}

#[tokio::main]
async fn main() {
    logx::init(&logx::LogConfig::from_env());

    println!("======================================");
    println!("    Domain Classification Example     ");
    println!("======================================");

    let svc = PriceService {
        api: ExchangeApi {
            calls: AtomicU32::new(0),
        },
        db: DatabaseService {
            saves: AtomicU32::new(0),
        },
    };

    example_retry_temporary(&svc).await;
    example_permanent(&svc).await;
    example_domains();

    println!("\n=== Summary ===");
    println!("1. Automatic retry for temporary errors");
    println!("2. Skip retry for permanent errors");
    println!("3. Domain-based error categorization");
    println!("4. Clear error context and troubleshooting hints");
}
