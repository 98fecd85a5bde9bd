//! Panic capture through the process-wide logger
//!
//! Everything here swaps the global logger, so it runs as one sequential
//! test.

use faultline::logx::{self, Level};
use faultline::recovery::{panic_handler, panic_message, recover, safe_go, safe_spawn};
use faultline::testing::CaptureSink;
use std::panic;

#[test]
fn test_panic_helpers_log_through_global_logger() {
    let sink = CaptureSink::new();
    logx::set_logger(sink.logger(Level::Info));

    // ========================================================================
    // safe_go: logged once, still fatal for the joiner
    // ========================================================================

    let handle = safe_go("worker", || panic!("boom")).unwrap();
    let payload = handle.join().unwrap_err();

    assert_eq!(panic_message(&*payload), "boom");
    assert_eq!(sink.len(), 1);
    let record = sink.last().unwrap();
    assert_eq!(record["level"], "ERROR");
    assert_eq!(record["msg"], "[worker] Panic recovered");
    assert_eq!(record["panic_value"], "boom");
    assert!(sink.lines()[0].contains("boom"));

    // ========================================================================
    // safe_go: no panic, no log
    // ========================================================================

    sink.clear();
    let handle = safe_go("quiet", || "done").unwrap();
    assert_eq!(handle.join().unwrap(), "done");
    assert!(sink.is_empty());

    // ========================================================================
    // panic_handler: re-raises with the original payload
    // ========================================================================

    let caught = panic::catch_unwind(|| {
        panic_handler("main", || panic!("critical error in main"))
    });
    let payload = caught.unwrap_err();
    assert_eq!(panic_message(&*payload), "critical error in main");
    assert!(sink.find("[main] Panic recovered").is_some());

    // ========================================================================
    // recover: panic becomes a report
    // ========================================================================

    sink.clear();
    let err = recover("task-worker-2", || -> u32 {
        panic!("task {} failed unexpectedly", 2)
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "panic recovered: task 2 failed unexpectedly");
    let record = sink.find("[task-worker-2] Panic recovered").unwrap();
    assert_eq!(record["error"], "panic recovered: task 2 failed unexpectedly");
    assert!(record["error_verbose"]
        .as_str()
        .unwrap()
        .contains("stack boundary"));

    // ========================================================================
    // safe_spawn: JoinError reports the panic
    // ========================================================================

    sink.clear();
    tokio_test::block_on(async {
        let err = safe_spawn("fetcher", async { panic!("lost connection") })
            .await
            .unwrap_err();
        assert!(err.is_panic());
    });
    let record = sink.find("[fetcher] Panic recovered").unwrap();
    assert_eq!(record["panic_value"], "lost connection");
}
