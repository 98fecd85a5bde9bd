//! Panic capture at thread and task boundaries.
//!
//! A panic that escapes a background thread or task is easy to lose. The
//! helpers here catch the unwind at the boundary, turn the payload into a
//! [`Report`] with a stack boundary, and log it at error level as
//! `[component] Panic recovered` with a `panic_value` field. What happens
//! next depends on the helper:
//!
//! - [`panic_handler`], [`safe_go`] and [`safe_spawn`] resume the unwind
//!   with the original payload, so the failure still reaches whoever joins
//!   the thread or task.
//! - [`recover`] returns the report instead.
//!
//! # Examples
//!
//! ```
//! use faultline::recovery::recover;
//!
//! let result = recover("parser", || -> u32 { panic!("unexpected token") });
//!
//! let err = result.unwrap_err();
//! assert_eq!(err.to_string(), "panic recovered: unexpected token");
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::kv;
use crate::logx::{self, Logger};
use crate::report::Report;

/// The text of a panic payload.
///
/// Payloads raised by `panic!` are `&str` or `String`; anything else is
/// described as `Box<dyn Any>`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or(payload.downcast_ref::<&str>().copied())
        .unwrap_or("Box<dyn Any>")
        .to_string()
}

/// Build the `panic recovered: <payload>` report for a caught panic.
#[track_caller]
pub fn panic_report(payload: &(dyn Any + Send)) -> Report {
    Report::msg(format!("panic recovered: {}", panic_message(payload))).with_stack()
}

/// Panic capture for one named component.
///
/// Logs to the process-wide logger unless given one with
/// [`Recovery::with_logger`].
///
/// # Examples
///
/// ```
/// use faultline::logx::Level;
/// use faultline::recovery::Recovery;
/// use faultline::testing::CaptureSink;
///
/// let sink = CaptureSink::new();
/// let recovery = Recovery::new("importer").with_logger(sink.logger(Level::Info));
///
/// assert_eq!(recovery.recover(|| 7).unwrap(), 7);
/// assert!(recovery.recover(|| -> i32 { panic!("bad row") }).is_err());
///
/// let record = sink.find("[importer] Panic recovered").unwrap();
/// assert_eq!(record["panic_value"], "bad row");
/// ```
#[derive(Debug, Clone)]
pub struct Recovery {
    component: String,
    logger: Option<Arc<Logger>>,
}

impl Recovery {
    /// Capture panics for `component`.
    pub fn new(component: impl Into<String>) -> Self {
        Recovery {
            component: component.into(),
            logger: None,
        }
    }

    /// Log to `logger` instead of the process-wide logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// The component name used in log messages.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Run `f`, logging and re-raising any panic.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(payload) => {
                self.log_panic(&*payload);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Run `f`, logging any panic and returning it as a report.
    pub fn recover<T>(&self, f: impl FnOnce() -> T) -> Result<T, Report> {
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| self.log_panic(&*payload))
    }

    /// Run `f` on a new thread named after the component.
    ///
    /// A panic in `f` is logged, then re-raised so that joining the handle
    /// returns `Err` with the original payload.
    pub fn spawn<F, T>(self, f: F) -> Result<thread::JoinHandle<T>, Report>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let name = self.component.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run(f))
            .map_err(|err| Report::new(err).wrap(format!("failed to spawn thread {}", name)))
    }

    /// Run `future` as a tokio task.
    ///
    /// A panic is logged, then re-raised so that awaiting the handle returns
    /// a [`JoinError`](tokio::task::JoinError) for which `is_panic()` holds.
    #[cfg(feature = "async")]
    pub fn spawn_task<F>(self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(async move {
            match catch(future).await {
                Ok(value) => value,
                Err(payload) => {
                    self.log_panic(&*payload);
                    panic::resume_unwind(payload)
                }
            }
        })
    }

    /// Await `future`, logging any panic and returning it as a report.
    pub async fn recover_async<F>(&self, future: F) -> Result<F::Output, Report>
    where
        F: Future,
    {
        catch(future).await.map_err(|payload| self.log_panic(&*payload))
    }

    fn log_panic(&self, payload: &(dyn Any + Send)) -> Report {
        let err = panic_report(payload);
        let logger = self.logger.clone().unwrap_or_else(logx::logger);
        logger.error_err(
            &format!("[{}] Panic recovered", self.component),
            &err,
            kv! { "panic_value" => panic_message(payload) },
        );
        err
    }
}

async fn catch<F>(future: F) -> Result<F::Output, Box<dyn Any + Send>>
where
    F: Future,
{
    use futures::FutureExt;

    AssertUnwindSafe(future).catch_unwind().await
}

/// Run `f`, logging any panic as `[component] Panic recovered` and then
/// re-raising it with the original payload.
///
/// ```
/// use faultline::recovery::panic_handler;
///
/// let caught = std::panic::catch_unwind(|| {
///     panic_handler("main", || panic!("critical error in main"))
/// });
/// assert!(caught.is_err());
/// ```
pub fn panic_handler<T>(component: &str, f: impl FnOnce() -> T) -> T {
    Recovery::new(component).run(f)
}

/// Run `f`, logging any panic and returning it as a report.
pub fn recover<T>(component: &str, f: impl FnOnce() -> T) -> Result<T, Report> {
    Recovery::new(component).recover(f)
}

/// Spawn a named thread whose panics are logged before they propagate.
///
/// ```
/// use faultline::recovery::safe_go;
///
/// let handle = safe_go("worker", || 40 + 2).unwrap();
/// assert_eq!(handle.join().unwrap(), 42);
/// ```
pub fn safe_go<F, T>(name: &str, f: F) -> Result<thread::JoinHandle<T>, Report>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Recovery::new(name).spawn(f)
}

/// Spawn a tokio task whose panics are logged before they propagate.
///
/// ```
/// use faultline::recovery::safe_spawn;
///
/// # tokio_test::block_on(async {
/// let handle = safe_spawn("fetcher", async { panic!("lost connection") });
/// let err = handle.await.unwrap_err();
/// assert!(err.is_panic());
/// # });
/// ```
#[cfg(feature = "async")]
pub fn safe_spawn<F>(name: &str, future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    Recovery::new(name).spawn_task(future)
}
