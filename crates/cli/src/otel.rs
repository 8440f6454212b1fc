//! OTLP export of tracing spans.

use {
    opentelemetry::trace::TracerProvider as _,
    opentelemetry_otlp::{SpanExporter, WithExportConfig},
    opentelemetry_sdk::{Resource, trace::SdkTracerProvider},
    tracing::Subscriber,
    tracing_subscriber::{Layer, registry::LookupSpan},
};

pub const SERVICE_NAME: &str = "gamebridge";

/// Batch-exporting tracer provider sending spans to `endpoint` over gRPC.
pub fn tracer_provider(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    Ok(SdkTracerProvider::builder()
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .with_batch_exporter(exporter)
        .build())
}

pub fn layer<S>(provider: &SdkTracerProvider) -> impl Layer<S> + use<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
}
