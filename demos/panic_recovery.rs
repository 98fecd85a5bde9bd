//! Panic Recovery Example
//!
//! Demonstrates catching panics at thread and task boundaries:
//! - Recovering worker panics without losing the other workers
//! - Turning different kinds of panics into reports
//! - Logging and re-raising with panic_handler
//! - A background worker whose tasks may panic

use std::panic;
use std::thread;
use std::time::Duration;

use faultline::recovery::{panic_handler, panic_message, safe_go, safe_spawn, Recovery};
use faultline::{kv, logx};

// ==================== Risky work ====================

#[derive(Debug, Clone, Copy)]
enum PanicKind {
    MissingValue,
    IndexOutOfRange,
    Explicit,
}

impl PanicKind {
    fn name(self) -> &'static str {
        match self {
            PanicKind::MissingValue => "missing_value",
            PanicKind::IndexOutOfRange => "index_out_of_range",
            PanicKind::Explicit => "explicit",
        }
    }
}

fn risky_operation(kind: Option<PanicKind>) {
    match kind {
        Some(PanicKind::MissingValue) => {
            let value: Option<&str> = None;
            let _ = value.unwrap();
        }
        Some(PanicKind::IndexOutOfRange) => {
            let values = [1, 2, 3];
            let index = std::hint::black_box(10);
            println!("value: {}", values[index]);
        }
        Some(PanicKind::Explicit) => panic!("explicit panic triggered"),
        None => {}
    }
    println!("Operation completed successfully");
}

fn process_task(task_id: u32, should_panic: bool) {
    println!("Processing task {}...", task_id);
    if should_panic {
        panic!("task {} failed unexpectedly", task_id);
    }
    thread::sleep(Duration::from_millis(100));
    println!("Task {} completed", task_id);
}

// ==================== Examples ====================

/// Example 1: Workers that recover instead of re-raising
fn example_workers() {
    println!("\n=== Example 1: Recovering worker panics ===");

    let handles: Vec<_> = [(1, false), (2, true), (3, false)]
        .into_iter()
        .map(|(id, should_panic)| {
            thread::spawn(move || {
                let recovery = Recovery::new(format!("task-worker-{}", id));
                let _ = recovery.recover(|| process_task(id, should_panic));
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }
    println!("All workers completed (task 2 panicked but was recovered)");
}

/// Example 2: Manual recovery of different panic kinds
fn example_panic_kinds() {
    println!("\n=== Example 2: Recovering different kinds of panics ===");

    let recovery = Recovery::new("manual");
    for kind in [
        PanicKind::MissingValue,
        PanicKind::IndexOutOfRange,
        PanicKind::Explicit,
    ] {
        println!("\nTesting panic kind: {}", kind.name());
        if let Err(err) = recovery.recover(|| risky_operation(Some(kind))) {
            println!("Recovered from panic: {}", err);
        }
    }

    println!("\nTesting successful operation:");
    match recovery.recover(|| risky_operation(None)) {
        Ok(()) => println!("Operation completed without panic"),
        Err(err) => println!("Unexpected error: {}", err),
    }
}

/// Example 3: safe_go logs, then the joiner still sees the panic
fn example_safe_go() {
    println!("\n=== Example 3: safe_go re-raises after logging ===");

    match safe_go("importer", || process_task(7, true)) {
        Ok(handle) => match handle.join() {
            Ok(()) => println!("Importer finished"),
            Err(payload) => println!("Importer thread died: {}", panic_message(&*payload)),
        },
        Err(err) => logx::error_err("Failed to start importer", &err, kv! {}),
    }
}

/// Example 4: panic_handler logs before re-raising
fn example_panic_handler() {
    println!("\n=== Example 4: Using panic_handler ===");
    println!("The panic is logged, then re-raised to the caller");

    let caught = panic::catch_unwind(|| panic_handler("main", || panic!("critical error in main")));
    if let Err(payload) = caught {
        println!("\nCaught re-raised panic: {}", panic_message(&*payload));
        println!("Without a catch this would end the thread");
    }
}

/// Example 5: Background worker whose tasks run as tokio tasks
async fn example_background_worker(worker_id: u32, task_count: u32) {
    println!("\n=== Example 5: Background worker with panic recovery ===");
    println!(
        "Starting background worker with {} tasks (some will panic)",
        task_count
    );

    let mut handles = Vec::new();
    for task in 1..=task_count {
        let name = format!("worker-{}-task-{}", worker_id, task);
        handles.push(safe_spawn(&name, async move {
            process_task(task, task % 5 == 0);
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let mut failed = 0;
    for handle in handles {
        if handle.await.is_err() {
            failed += 1;
        }
    }
    println!("\nAll background tasks completed ({} panicked)", failed);
}

#[tokio::main]
async fn main() {
    logx::init(&logx::LogConfig::from_env());

    println!("======================================");
    println!("       Panic Recovery Example         ");
    println!("======================================");

    example_workers();
    example_panic_kinds();
    example_safe_go();
    example_panic_handler();
    example_background_worker(1, 10).await;

    println!("\n=== Summary ===");
    println!("1. recover: turns a panic into a report and keeps going");
    println!("2. panic_handler: logs the panic, then re-raises it");
    println!("3. safe_go / safe_spawn: the same for threads and tokio tasks");
    println!("4. Every panic is logged with its payload and a stack boundary");
}
