//! Internal logging and tracing configurations

use std::env;

use opentelemetry::{KeyValue, TraceId, trace::TraceContextExt as _, trace::TracerProvider};
use opentelemetry_otlp::{SpanExporter, WithExportConfig as _};
use opentelemetry_resource_detectors::{K8sResourceDetector, ProcessResourceDetector};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_opentelemetry::{OpenTelemetryLayer, OpenTelemetrySpanExt as _};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable holding the log filter, e.g. `info` or `scrapeconfig_provider=debug`
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
/// Environment variable selecting the log format, `json` or anything else for plain text
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
/// Spans are exported over OTLP to this endpoint when it is set and non-empty
pub const OTEL_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Trace id of the current span, [`TraceId::INVALID`] unless spans are exported
pub fn get_trace_id() -> TraceId {
    tracing::Span::current()
        .context()
        .span()
        .span_context()
        .trace_id()
}

fn resource() -> Resource {
    Resource::builder()
        .with_detector(Box::new(K8sResourceDetector))
        .with_detector(Box::new(ProcessResourceDetector))
        .with_service_name(env!("CARGO_PKG_NAME"))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build()
}

fn tracer_provider(endpoint: String) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build())
}

/// Collector endpoint, empty values disable the export
fn otel_endpoint() -> Option<String> {
    env::var(OTEL_ENDPOINT_ENV).ok().filter(|endpoint| !endpoint.is_empty())
}

fn is_json_format() -> bool {
    env::var(LOG_FORMAT_ENV).is_ok_and(|v| v == "json")
}

/// Flushes pending spans when dropped
#[must_use = "spans are only exported while the guard is alive"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(err) = provider.shutdown()
        {
            tracing::warn!(error = %err, "failed to shut down tracer provider");
        }
    }
}

/// Initializes tracing with subscribers.
///
/// Logs go to stderr so that stdout only carries command output.
/// # Errors
/// Will return `Err` if it wasn't able to intialize tracing
pub fn init() -> anyhow::Result<TelemetryGuard> {
    let logger = if is_json_format() {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let env_filter = EnvFilter::from_env(LOG_LEVEL_ENV);

    let reg = Registry::default().with(env_filter).with(logger);

    if let Some(endpoint) = otel_endpoint() {
        let provider = tracer_provider(endpoint)?;
        let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
        reg.with(OpenTelemetryLayer::new(tracer)).try_init()?;
        Ok(TelemetryGuard {
            provider: Some(provider),
        })
    } else {
        reg.try_init()?;
        Ok(TelemetryGuard { provider: None })
    }
}
