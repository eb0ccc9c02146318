use color_eyre::Result;
use color_eyre::eyre::Context;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const SERVICE_NAME: &str = "model-gallery";

/// Noisy dependencies are held at `warn` unless the filter names them explicitly.
const QUIET_TARGETS: &[&str] = &["sqlx", "aws_smithy_runtime", "aws_config", "hyper_util"];

/// Builds the filter from a `RUST_LOG`-style directive string.
pub fn build_filter(directives: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(directives)
        .wrap_err_with(|| format!("Invalid log filter: {directives}"))?;

    for target in QUIET_TARGETS {
        if !directives.contains(target) {
            filter = filter.add_directive(
                format!("{target}=warn")
                    .parse()
                    .wrap_err("Failed to build log directive")?,
            );
        }
    }

    Ok(filter)
}

fn otlp_provider(service_name: &str, endpoint: &str) -> Result<SdkTracerProvider> {
    let resource = Resource::builder()
        .with_attributes(vec![KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            service_name.to_string(),
        )])
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .wrap_err("Failed to create OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Installs the global subscriber. When `otlp_endpoint` is set, spans are also
/// exported there; keep the returned provider and pass it to [`shutdown_tracing`].
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    directives: &str,
) -> Result<Option<SdkTracerProvider>> {
    let filter_layer = build_filter(directives)?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let Some(endpoint) = otlp_endpoint else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init()
            .wrap_err("Failed to install tracing subscriber")?;
        return Ok(None);
    };

    let tracer_provider = otlp_provider(service_name, endpoint)?;
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());
    let tracer = opentelemetry::global::tracer(service_name.to_string());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    log::debug!("Exporting traces to {endpoint}");
    Ok(Some(tracer_provider))
}

/// Flushes pending spans before exit.
pub fn shutdown_tracing(provider: Option<SdkTracerProvider>) {
    if let Some(provider) = provider
        && let Err(e) = provider.shutdown()
    {
        eprintln!("Failed to flush traces: {e}");
    }
}
