use anyhow::Result;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = match &config.file_path {
        Some(file_path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_current_span(true)
                        .with_writer(writer),
                )
                .try_init()?;
        }
        _ => {
            registry
                .with(
                    fmt::layer()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_target(false)
                        .with_writer(writer),
                )
                .try_init()?;
        }
    }

    tracing::info!("Logging initialized with level: {}", config.level);
    Ok(())
}

/// Span wrapping one compile of one order.
pub fn planning_span(order_id: &str) -> tracing::Span {
    tracing::info_span!("compile_order", order_id = %order_id)
}

/// Log a `PlanningError` together with its stable error code.
#[macro_export]
macro_rules! log_planning_error {
    ($err:expr, $msg:expr) => {
        tracing::error!(error = %$err, code = $err.error_code(), $msg);
    };
    ($err:expr, $msg:expr, $($field:tt)*) => {
        tracing::error!(error = %$err, code = $err.error_code(), $($field)*, $msg);
    };
}

/// Log a stage boundary of the compile pipeline.
#[macro_export]
macro_rules! log_stage {
    ($stage:expr, $order_id:expr) => {
        tracing::info!(stage = $stage, order_id = %$order_id, "stage complete");
    };
    ($stage:expr, $order_id:expr, $($field:tt)*) => {
        tracing::info!(stage = $stage, order_id = %$order_id, $($field)*, "stage complete");
    };
}
