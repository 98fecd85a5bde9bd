//! End-to-end tests for the retry driver over annotated exchange errors

use faultline::domain::{self, is_exchange_code, new_exchange_error, wrap_with_domain};
use faultline::logx::Level;
use faultline::retry::{Backoff, Retry, RetryError};
use faultline::testing::CaptureSink;
use faultline::{assert_domain, assert_permanent, assert_temporary, Report, ResultExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct FlakyExchange {
    calls: AtomicU32,
    fail_first: u32,
    retriable: bool,
}

impl FlakyExchange {
    fn new(fail_first: u32, retriable: bool) -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first,
            retriable,
        }
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64, Report> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            let code = if self.retriable {
                "NETWORK_ERROR"
            } else {
                "INVALID_SYMBOL"
            };
            return Err(new_exchange_error(code, "exchange call failed", self.retriable))
                .wrap_err(format!("failed to fetch {}", symbol));
        }
        Ok(50_000.0)
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_two_temporary_failures_then_success() {
    let sink = CaptureSink::new();
    let exchange = Arc::new(FlakyExchange::new(2, true));
    let times = Arc::new(Mutex::new(Vec::new()));

    let price = Retry::new(Backoff::new(3, Duration::from_millis(100)))
        .with_logger(sink.logger(Level::Info))
        .run(|_| {
            let exchange = exchange.clone();
            let times = times.clone();
            async move {
                times.lock().unwrap().push(Instant::now());
                exchange.fetch_price("BTC/USD").await
            }
        })
        .await
        .unwrap();

    assert_eq!(price, 50_000.0);
    assert_eq!(exchange.calls(), 3);

    let times = times.lock().unwrap();
    assert_eq!(times[1] - times[0], Duration::from_millis(120));
    assert_eq!(times[2] - times[1], Duration::from_millis(240));

    let success = sink.find("Operation succeeded after retry").unwrap();
    assert_eq!(success["attempt"], 3);

    let warning = sink
        .find("Operation failed with temporary error, retrying")
        .unwrap();
    assert_eq!(
        warning["error"],
        "failed to fetch BTC/USD: exchange error [NETWORK_ERROR]: exchange call failed"
    );
    assert!(warning["error_source"].as_str().unwrap().contains(".rs:"));
}

#[tokio::test(start_paused = true)]
async fn test_permanent_exchange_error_keeps_annotations() {
    let sink = CaptureSink::new();
    let exchange = Arc::new(FlakyExchange::new(u32::MAX, false));

    let err = Retry::new(Backoff::new(5, Duration::from_millis(100)))
        .with_logger(sink.logger(Level::Info))
        .run(|_| {
            let exchange = exchange.clone();
            async move { exchange.fetch_price("XYZ/USD").await }
        })
        .await
        .unwrap_err();

    assert_eq!(exchange.calls(), 1);
    assert_permanent!(err);
    assert_domain!(err, domain::EXCHANGE);
    assert!(is_exchange_code(&err, "INVALID_SYMBOL"));

    let record = sink.find("Operation failed with permanent error").unwrap();
    assert_eq!(record["error_domain"], "exchange");
    assert_eq!(
        record["error_hints"][0],
        "This error is permanent and should not be retried"
    );
    assert_eq!(record["error_details"][0], "code=INVALID_SYMBOL retry=false");
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_error_can_be_rewrapped_at_usecase_boundary() {
    let sink = CaptureSink::new();
    let exchange = Arc::new(FlakyExchange::new(u32::MAX, true));

    let err = Retry::new(Backoff::new(3, Duration::from_millis(10)))
        .with_logger(sink.logger(Level::Info))
        .run(|_| {
            let exchange = exchange.clone();
            async move { exchange.fetch_price("ETH/USD").await }
        })
        .await
        .unwrap_err();

    assert_eq!(exchange.calls(), 3);
    assert!(err.to_string().starts_with("operation failed after 3 attempts"));

    let err = wrap_with_domain(err, "failed to update price", domain::USECASE);
    assert_temporary!(err);
    assert_domain!(err, domain::USECASE);
    assert!(is_exchange_code(&err, "NETWORK_ERROR"));
    assert_eq!(
        err.messages(),
        vec![
            "failed to update price",
            "operation failed after 3 attempts",
            "failed to fetch ETH/USD",
            "exchange error [NETWORK_ERROR]: exchange call failed",
        ]
    );

    let record = sink.find("Operation failed after max retries").unwrap();
    assert_eq!(record["level"], "ERROR");
    assert_eq!(record["max_retries"], 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_retry() {
    let sink = CaptureSink::new();
    let exchange = Arc::new(FlakyExchange::new(u32::MAX, true));
    let shutdown = CancellationToken::new();

    let retry = Retry::new(Backoff::new(10, Duration::from_secs(2)))
        .with_logger(sink.logger(Level::Info))
        .with_cancellation(shutdown.child_token());

    let task = tokio::spawn({
        let exchange = exchange.clone();
        async move {
            retry
                .run(|_| {
                    let exchange = exchange.clone();
                    async move { exchange.fetch_price("BTC/USD").await }
                })
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(exchange.calls(), 1);
    assert!(matches!(
        err.find::<RetryError>(),
        Some(RetryError::Cancelled { attempt: 1 })
    ));
    assert!(sink.find("Retry cancelled").is_some());
}
