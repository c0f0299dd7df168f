//! Logging and metrics bootstrap

use crate::config::LoggingConfig;
use metrics::counter;
use once_cell::sync::OnceCell;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

static LOGGING: OnceCell<()> = OnceCell::new();

/// Initialize structured logging once per process.
///
/// The level acts as the default directive; `RUST_LOG` still takes
/// precedence through the env filter.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    if LOGGING.set(()).is_err() {
        return Err(anyhow::anyhow!("logging already initialized"));
    }

    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format.to_lowercase().as_str() {
        "json" => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE);
            registry.with(json_layer).init();
        }
        _ => {
            let pretty_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_span_events(FmtSpan::CLOSE);
            registry.with(pretty_layer).init();
        }
    }

    info!("logging initialized");
    Ok(())
}

/// Pipeline counters on the `metrics` facade. They stay inert until the host
/// installs a recorder.
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record an event delivered on a source channel.
    pub fn event_emitted(action: &str) {
        counter!("rowcast_events_emitted_total").increment(1);
        counter!("rowcast_events_emitted_by_action_total", "action" => action.to_string())
            .increment(1);
    }

    /// Record an event dropped by the extractor checks.
    pub fn event_dropped(reason: &'static str) {
        counter!("rowcast_events_dropped_total", "reason" => reason).increment(1);
    }

    /// Record a successful checkpoint save.
    pub fn checkpoint_saved() {
        counter!("rowcast_checkpoint_saves_total").increment(1);
    }

    /// Record a failed checkpoint save.
    pub fn checkpoint_failed() {
        counter!("rowcast_checkpoint_failures_total").increment(1);
    }
}
