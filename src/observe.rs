//! Pipeline observability hooks.
//!
//! Deployments install a [`StageMetrics`] recorder for latency histograms
//! and/or a [`StageEventLogger`] for structured per-stage events. Both are
//! process-wide and swappable at runtime; the built-in [`KeyValueLogger`]
//! writes escaped key-value lines to any writer.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};

/// Pipeline stage captured in observability events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Routing,
    Load,
    GeoFilter,
    Process,
    Render,
    Payload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Routing => "routing",
            Stage::Load => "load",
            Stage::GeoFilter => "geo_filter",
            Stage::Process => "process",
            Stage::Render => "render",
            Stage::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Outcome of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Success,
    Failure,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageStatus::Success => "success",
            StageStatus::Failure => "failure",
        })
    }
}

/// One structured observation.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub stage: Stage,
    pub status: StageStatus,
    pub latency: Duration,
    /// Endpoint involved, when known.
    pub endpoint: Option<String>,
    pub error: Option<String>,
}

impl StageEvent {
    pub(crate) fn new(
        stage: Stage,
        latency: Duration,
        endpoint: Option<&str>,
        error: Option<String>,
    ) -> Self {
        Self {
            stage,
            status: if error.is_some() {
                StageStatus::Failure
            } else {
                StageStatus::Success
            },
            latency,
            endpoint: endpoint.map(str::to_string),
            error,
        }
    }

    fn format_key_values(&self, include_timestamp: bool) -> String {
        let mut parts = Vec::new();
        if include_timestamp {
            let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            parts.push(format!("timestamp=\"{ts}\""));
        }
        parts.push(format!("stage={}", self.stage));
        parts.push(format!("status={}", self.status));
        parts.push(format!("latency_us={}", self.latency.as_micros()));
        if let Some(endpoint) = &self.endpoint {
            parts.push(format!("endpoint=\"{}\"", escape_kv(endpoint)));
        }
        if let Some(error) = &self.error {
            parts.push(format!("error=\"{}\"", escape_kv(error)));
        }
        parts.join(" ")
    }
}

fn escape_kv(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Latency recorder installed by the host application.
pub trait StageMetrics: Send + Sync {
    fn record(&self, stage: Stage, latency: Duration, success: bool);
}

/// Structured event sink.
pub trait StageEventLogger: Send + Sync {
    fn log(&self, event: &StageEvent);
}

/// Key-value logger writing one escaped line per event.
pub struct KeyValueLogger {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    include_timestamp: bool,
}

impl KeyValueLogger {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            include_timestamp: true,
        }
    }

    pub fn with_timestamps(mut self, include_timestamp: bool) -> Self {
        self.include_timestamp = include_timestamp;
        self
    }
}

impl StageEventLogger for KeyValueLogger {
    fn log(&self, event: &StageEvent) {
        if let Ok(mut writer) = self.writer.lock() {
            let line = event.format_key_values(self.include_timestamp);
            let _ = writeln!(writer, "{line}");
        }
    }
}

/// Install or clear the global stage metrics recorder.
pub fn set_stage_metrics(recorder: Option<Arc<dyn StageMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn StageMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn StageMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn StageMetrics>> {
    metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Install or clear the global stage event logger.
pub fn set_stage_logger(logger: Option<Arc<dyn StageEventLogger>>) {
    let lock = logger_lock();
    let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = logger;
}

fn logger_lock() -> &'static RwLock<Option<Arc<dyn StageEventLogger>>> {
    static LOGGER: OnceLock<RwLock<Option<Arc<dyn StageEventLogger>>>> = OnceLock::new();
    LOGGER.get_or_init(|| RwLock::new(None))
}

pub(crate) fn event_logger() -> Option<Arc<dyn StageEventLogger>> {
    logger_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Emit one stage observation to whatever hooks are installed.
pub(crate) fn observe(stage: Stage, latency: Duration, endpoint: Option<&str>, error: Option<String>) {
    if let Some(metrics) = metrics_recorder() {
        metrics.record(stage, latency, error.is_none());
    }
    if let Some(logger) = event_logger() {
        logger.log(&StageEvent::new(stage, latency, endpoint, error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_line_escapes_and_orders_fields() {
        let event = StageEvent::new(
            Stage::Process,
            Duration::from_micros(420),
            Some("/strategic-analysis"),
            Some("bad \"quote\"".into()),
        );
        let line = event.format_key_values(false);
        assert!(line.starts_with("stage=process status=failure latency_us=420"));
        assert!(line.contains("endpoint=\"/strategic-analysis\""));
        assert!(line.contains("bad \\\"quote\\\""));
    }

    #[test]
    fn logger_writes_one_line_per_event() {
        struct SharedBuf(Arc<Mutex<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = Arc::new(Mutex::new(Vec::new()));
        let logger = KeyValueLogger::new(Box::new(SharedBuf(sink.clone()))).with_timestamps(false);
        logger.log(&StageEvent::new(
            Stage::Routing,
            Duration::from_micros(10),
            None,
            None,
        ));
        logger.log(&StageEvent::new(
            Stage::Render,
            Duration::from_micros(20),
            None,
            None,
        ));

        let written = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.contains("stage=routing"));
        assert!(written.contains("stage=render"));
    }

    #[test]
    fn hooks_swap_at_runtime() {
        set_stage_metrics(None);
        assert!(metrics_recorder().is_none());

        struct Counter;
        impl StageMetrics for Counter {
            fn record(&self, _stage: Stage, _latency: Duration, _success: bool) {}
        }
        set_stage_metrics(Some(Arc::new(Counter)));
        assert!(metrics_recorder().is_some());
        set_stage_metrics(None);
    }
}
