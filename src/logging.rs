// Logging setup: pretty console output, optional JSON log file, span timing for spans tagged `on_close = true`
use std::env;
use std::fs;
use std::sync::OnceLock;
use std::time::Instant;
use eyre::{Result, eyre};
use tracing::{Id, Subscriber, debug, field::Field, field::Visit, span};
use tracing_subscriber::{
    fmt,
    EnvFilter,
    layer::{SubscriberExt, Layer, Context},
    util::SubscriberInitExt,
};

static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn crate_filter(bin_name: &str, level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("warn,bond_yield_watcher={level},{bin_name}={level}"))
        .unwrap_or_else(|_| EnvFilter::new("warn,bond_yield_watcher=info"))
}

pub fn init_logging(bin_name: String) -> Result<()> {
    let console_log_level = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let file_log_level = env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_to_file = env::var("LOG_TO_FILE").map(|v| v == "true").unwrap_or(false);

    let console_layer = fmt::Layer::new()
        .pretty()
        .with_filter(crate_filter(&bin_name, &console_log_level));

    if log_to_file {
        let log_dir = std::path::Path::new("logs");
        fs::create_dir_all(log_dir)?;
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        let file_appender = tracing_appender::rolling::never(log_dir, format!("{bin_name}_{timestamp}.log"));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        FILE_GUARD
            .set(guard)
            .map_err(|_| eyre!("logging already initialized"))?;

        let file_layer = fmt::Layer::new()
            .json()
            .with_writer(non_blocking)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(crate_filter(&bin_name, &file_log_level));

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .with(SpanTimingLayer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .with(SpanTimingLayer)
            .try_init()?;
    }
    Ok(())
}

// Reports the wall-clock lifetime of spans opened with `on_close = true`
struct SpanTimingLayer;

struct OpenedAt(Instant);

struct OnCloseVisitor(bool);

impl Visit for OnCloseVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "on_close" {
            self.0 = value;
        }
    }
    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S> Layer<S> for SpanTimingLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = OnCloseVisitor(false);
        attrs.record(&mut visitor);
        if !visitor.0 {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(OpenedAt(Instant::now()));
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(&id) {
            if let Some(OpenedAt(opened)) = span.extensions_mut().remove::<OpenedAt>() {
                debug!(span = span.name(), total_time = ?opened.elapsed(), "span closed");
            }
        }
    }
}
