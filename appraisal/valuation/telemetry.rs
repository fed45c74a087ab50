use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use appraisal_events::{EventPublisher, EventRecord};
use appraisal_logging::{JsonLogger, LogLevel, LogRecord};
use once_cell::sync::OnceCell;
use serde_json::Value;
use tokio::runtime::{Handle, Runtime};

/// Builder for [`ValuationTelemetry`].
pub struct ValuationTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl ValuationTelemetryBuilder {
    /// Creates the builder for the named component.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            event_publisher: None,
        }
    }

    /// Writes JSON-lines logs to this file.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops log records below this level.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Publishes lifecycle events here.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Opens the log file and event runtime.
    pub fn build(self) -> Result<ValuationTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::with_min_level(path, self.min_level)?),
            None => None,
        };
        let event = match self.event_publisher {
            Some(publisher) => Some(EventHandle::new(publisher)),
            None => None,
        };
        Ok(ValuationTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
                event,
            }),
        })
    }
}

/// Cloneable handle to the log file and event publisher of one engine.
#[derive(Clone)]
pub struct ValuationTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ValuationTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuationTelemetry")
            .field("module", &self.inner.module)
            .field("logging", &self.inner.logger.is_some())
            .field("events", &self.inner.event.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
    event: Option<EventHandle>,
}

/// Publishes synchronously on a private runtime, built on first use outside
/// any tokio context. Inside a runtime the publish is spawned onto it and
/// completes in the background; failures there are only reported on stderr.
struct EventHandle {
    runtime: OnceCell<Runtime>,
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            runtime: OnceCell::new(),
            publisher,
        }
    }

    fn publish(&self, record: EventRecord) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(record).await {
                    eprintln!("valuation event publish failed: {err:?}");
                }
            });
            return Ok(());
        }
        let runtime = self.runtime.get_or_try_init(Runtime::new)?;
        runtime.block_on(self.publisher.publish(record))
    }
}

impl Drop for EventHandle {
    fn drop(&mut self) {
        // A plain drop blocks, which panics when the last handle goes away
        // inside an async context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl ValuationTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> ValuationTelemetryBuilder {
        ValuationTelemetryBuilder::new(module)
    }

    /// Writes one structured log line.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            if logger.enabled(level) {
                let record =
                    LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
                logger.log(&record)?;
            }
        }
        Ok(())
    }

    /// Publishes a lifecycle event.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(EventRecord::new(
                self.inner.module.clone(),
                event_type,
                payload,
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal_events::MemoryEventBus;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn telemetry_writes_log_and_event() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("valuation.log");
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = ValuationTelemetry::builder("valuation")
            .log_path(&path)
            .min_level(LogLevel::Info)
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Debug, "valuation.solver.pivot", json!({ "column": 0 }))
            .unwrap();
        telemetry
            .log(LogLevel::Info, "valuation.train.start", json!({ "records": 12 }))
            .unwrap();
        telemetry
            .event("valuation.model.trained", json!({ "r2": 0.9 }))
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("valuation.train.start"));
        assert!(!content.contains("valuation.solver.pivot"));
        assert_eq!(bus.snapshot().len(), 1);
    }

    #[test]
    fn publishes_from_inside_a_runtime_and_drops_cleanly() {
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = ValuationTelemetry::builder("valuation")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        // Outside tokio: publishes on the private runtime.
        telemetry.event("valuation.model.trained", json!({})).unwrap();
        assert_eq!(bus.snapshot().len(), 1);

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async move {
            telemetry.event("valuation.model.reset", json!({})).unwrap();
            for _ in 0..16 {
                if bus.snapshot().len() == 2 {
                    break;
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(bus.events_of_type("valuation.model.reset").len(), 1);
            // Last handle dropped while the runtime is driving this task.
            drop(telemetry);
        });
    }

    #[test]
    fn silent_without_sinks() {
        let telemetry = ValuationTelemetry::builder("valuation").build().unwrap();
        telemetry
            .log(LogLevel::Error, "valuation.train.failed", json!({}))
            .unwrap();
        telemetry.event("valuation.model.reset", json!({})).unwrap();
    }
}
