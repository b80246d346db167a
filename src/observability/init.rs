//! Tracing subscriber setup.

use super::tracer;
use crate::Config;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::resource::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Service name recorded on exported spans.
const SERVICE_NAME: &str = "frecent";

/// Installs the global tracing subscriber.
///
/// The pipeline is:
///
/// 1. an `EnvFilter` from `RUST_LOG`, else `config.trace_level`, else `"warn"`
/// 2. human-readable events on stderr
/// 3. if `config.trace_file` is set, spans exported as OTLP JSON lines to that
///    file (rotated at 10 MB)
///
/// Calling this more than once is harmless; only the first call installs a
/// subscriber. Failure to create the trace file's directory disables file
/// export but keeps stderr logging.
pub fn init_tracing(config: &Config) {
    let level = config.trace_level.clone().unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let otel_layer = config.trace_file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).ok()?;
        }
        let resource = Resource::new(vec![opentelemetry::KeyValue::new("service.name", SERVICE_NAME)]);
        let provider = tracer::create_tracer_provider(path.clone(), resource);
        Some(OpenTelemetryLayer::new(provider.tracer(SERVICE_NAME)))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(otel_layer)
        .try_init();
}
