//! Opt-in perf counters and logging setup.
//!
//! Counters are collected only when `PORTHOLE_PERF` is set to something other
//! than `0`, and are dumped to stderr by [`report`] when the viewer exits.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

static PERF_ENABLED: Lazy<bool> = Lazy::new(|| {
    std::env::var("PORTHOLE_PERF").is_ok_and(|value| !value.is_empty() && value != "0")
});

static REGISTRY: Lazy<Mutex<PerfRegistry>> = Lazy::new(|| Mutex::new(PerfRegistry::default()));

pub fn enabled() -> bool {
    *PERF_ENABLED
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Micros,
    Bytes,
    Events,
}

#[derive(Clone, Copy, Debug)]
struct Series {
    unit: Unit,
    samples: u64,
    total: u128,
    max: u128,
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let avg = self.total / u128::from(self.samples.max(1));
        match self.unit {
            Unit::Micros => write!(
                f,
                "n={} avg={avg}us max={}us",
                self.samples, self.max
            ),
            Unit::Bytes => write!(
                f,
                "n={} total={}B max={}B",
                self.samples, self.total, self.max
            ),
            Unit::Events => write!(f, "n={} avg={avg} max={}", self.samples, self.max),
        }
    }
}

/// Named series of samples, sorted by label.
#[derive(Debug, Default)]
struct PerfRegistry {
    series: BTreeMap<&'static str, Series>,
}

impl PerfRegistry {
    fn record(&mut self, label: &'static str, unit: Unit, value: u128) {
        let series = self.series.entry(label).or_insert(Series {
            unit,
            samples: 0,
            total: 0,
            max: 0,
        });
        series.samples += 1;
        series.total += value;
        series.max = series.max.max(value);
    }

    fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.series
            .iter()
            .map(|(label, series)| format!("[perf] {label}: {series}"))
    }
}

fn record(label: &'static str, unit: Unit, value: u128) {
    if enabled() {
        REGISTRY.lock().record(label, unit, value);
    }
}

pub fn record_duration(label: &'static str, duration: Duration) {
    record(label, Unit::Micros, duration.as_micros());
}

pub fn record_bytes(label: &'static str, bytes: usize) {
    record(label, Unit::Bytes, bytes as u128);
}

/// Records one occurrence carrying `count` items, e.g. the events of a flush.
pub fn record_events(label: &'static str, count: usize) {
    record(label, Unit::Events, count as u128);
}

/// Dumps every series collected so far.
pub fn report() {
    if !enabled() {
        return;
    }
    for line in REGISTRY.lock().lines() {
        eprintln!("{line}");
    }
}

/// Records the time until drop under `label`.
pub struct PerfGuard {
    label: &'static str,
    start: Instant,
}

impl PerfGuard {
    pub fn new(label: &'static str) -> Option<Self> {
        enabled().then(|| Self {
            label,
            start: Instant::now(),
        })
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        record_duration(self.label, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_reports_series_sorted_with_units() {
        let mut registry = PerfRegistry::default();
        registry.record("transport_image_bytes", Unit::Bytes, 2048);
        registry.record("flush_events", Unit::Events, 3);
        registry.record("flush_events", Unit::Events, 1);
        registry.record("canvas_update_tile", Unit::Micros, 150);

        let lines: Vec<_> = registry.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[perf] canvas_update_tile: n=1 avg=150us max=150us",
                "[perf] flush_events: n=2 avg=2 max=3",
                "[perf] transport_image_bytes: n=1 total=2048B max=2048B",
            ]
        );
    }
}

pub mod logging {
    use clap::ValueEnum;
    use std::fs::OpenOptions;
    use std::path::PathBuf;
    use std::sync::OnceLock;
    use tracing::level_filters::LevelFilter;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::EnvFilter;

    pub const FILTER_ENV: &str = "PORTHOLE_LOG_FILTER";

    #[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
    pub enum LogLevel {
        Error,
        #[default]
        Warn,
        Info,
        Debug,
        Trace,
    }

    impl LogLevel {
        pub fn to_filter(self) -> LevelFilter {
            match self {
                LogLevel::Error => LevelFilter::ERROR,
                LogLevel::Warn => LevelFilter::WARN,
                LogLevel::Info => LevelFilter::INFO,
                LogLevel::Debug => LevelFilter::DEBUG,
                LogLevel::Trace => LevelFilter::TRACE,
            }
        }
    }

    #[derive(Clone, Debug, Default)]
    pub struct LogConfig {
        pub level: LogLevel,
        pub file: Option<PathBuf>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum InitError {
        #[error("failed to open log file {path:?}: {source}")]
        Io {
            path: PathBuf,
            source: std::io::Error,
        },
        #[error("failed to configure logger: {0}")]
        Configure(String),
    }

    static INIT: OnceLock<()> = OnceLock::new();
    static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    /// Installs the global subscriber. Later calls are no-ops.
    pub fn init(config: &LogConfig) -> Result<(), InitError> {
        if INIT.get().is_some() {
            return Ok(());
        }
        inner_init(config)?;
        INIT.set(()).ok();
        Ok(())
    }

    fn inner_init(config: &LogConfig) -> Result<(), InitError> {
        let env_filter = build_env_filter(config.level.to_filter());

        let (writer, guard) = match &config.file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| InitError::Io {
                        path: path.clone(),
                        source,
                    })?;
                tracing_appender::non_blocking(file)
            }
            None => tracing_appender::non_blocking(std::io::stderr()),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_level(true)
            .with_target(config.level >= LogLevel::Debug)
            .with_thread_names(config.level >= LogLevel::Trace)
            .with_ansi(config.file.is_none())
            .with_writer(writer)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| InitError::Configure(err.to_string()))?;

        let _ = GUARD.set(guard);
        Ok(())
    }

    fn build_env_filter(level: LevelFilter) -> EnvFilter {
        match std::env::var(FILTER_ENV) {
            Ok(filter) => EnvFilter::new(filter),
            Err(_) => EnvFilter::new(default_filter_for(level)),
        }
    }

    /// Dependencies stay at `info` even when porthole itself traces.
    pub(crate) fn default_filter_for(level: LevelFilter) -> String {
        match level {
            LevelFilter::TRACE => "info,porthole=trace,porthole_core=trace".to_owned(),
            LevelFilter::DEBUG => "info,porthole=debug,porthole_core=debug".to_owned(),
            LevelFilter::INFO => "info".to_owned(),
            LevelFilter::WARN => "warn".to_owned(),
            LevelFilter::ERROR => "error".to_owned(),
            _ => "off".to_owned(),
        }
    }

}
