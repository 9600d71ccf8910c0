use std::fmt;
use std::fmt::Write;
use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::fmt::{time::FormatTime, Layer as FmtLayer};
use tracing_subscriber::{prelude::*, registry::Registry, EnvFilter};

use super::app_config::config;
use super::error::Result;

pub mod prelude {
    pub use tracing::{debug, info, trace, warn};
    pub use tracing::{debug_span, info_span, instrument};
}

/// Install the global subscriber as described by the `logging` config section.
///
/// Must run after the configuration is fully assembled.
pub fn setup() -> Result<LoggingGuard> {
    let cfg: LoggingConfig = config().get("logging")?;
    LoggingGuard::new(&cfg)
}

/// This needs to be held in main, dropping it flushes buffered lines
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
}

impl LoggingGuard {
    fn new(cfg: &LoggingConfig) -> Result<Self> {
        let (writer, guard) = cfg.target.to_writer();

        let fmt_layer = FmtLayer::default()
            .with_ansi(cfg.target.supports_color())
            .with_target(false)
            .with_timer(ISOTimeFormat)
            .with_writer(writer);

        Registry::default()
            .with(cfg.filter.to_env_filter()?)
            .with(fmt_layer)
            .try_init()?;

        Ok(Self { _worker_guard: guard })
    }
}

struct ISOTimeFormat;

impl FormatTime for ISOTimeFormat {
    fn format_time(&self, w: &mut dyn Write) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ====== Config to Layer ======

impl FilterConfig {
    fn to_env_filter(&self) -> Result<EnvFilter> {
        let filter = match &self.from_env {
            Some(env) => EnvFilter::from_env(env),
            None => EnvFilter::default(),
        };

        match &self.directives {
            Some(dirs) => dirs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .try_fold(filter, |f, s| -> Result<EnvFilter> { Ok(f.add_directive(s.parse()?)) }),
            None => Ok(filter),
        }
    }
}

impl LoggingTarget {
    fn supports_color(&self) -> bool {
        !matches!(self, LoggingTarget::File { .. })
    }

    fn to_writer(&self) -> (NonBlocking, WorkerGuard) {
        let builder = NonBlockingBuilder::default().lossy(false);
        match self {
            LoggingTarget::Stdout => builder.finish(std::io::stdout()),
            LoggingTarget::Stderr => builder.finish(std::io::stderr()),
            LoggingTarget::File { directory, name } => {
                builder.finish(tracing_appender::rolling::never(directory, name))
            }
        }
    }
}

// ====== Logging Config ======

#[derive(Debug, serde::Deserialize)]
struct LoggingConfig {
    filter: FilterConfig,
    target: LoggingTarget,
}

#[derive(Debug, Default, serde::Deserialize)]
struct FilterConfig {
    #[serde(default)]
    directives: Option<String>,
    #[serde(default, deserialize_with = "deserialize_filter_from_env")]
    from_env: Option<String>,
}

/// Where log lines go. The simulation output owns stdout, so the default is stderr.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
enum LoggingTarget {
    Stdout,
    Stderr,
    File { directory: PathBuf, name: PathBuf },
}

// ====== serde helpers ======

/// Deserialize `false` to `None`, `true` to `Some("RUST_LOG")`, and string to `Some(xxx)`
fn deserialize_filter_from_env<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct VisitFromEnv;

    impl<'de> serde::de::Visitor<'de> for VisitFromEnv {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("bool or environment variable name")
        }

        fn visit_bool<E>(self, value: bool) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value {
                Ok(Some("RUST_LOG".into()))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_owned()))
        }
    }

    deserializer.deserialize_any(VisitFromEnv)
}
