mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use kernelforge_backend_ort::{OnnxImporter, OrtBackend};
use kernelforge_core::{BuildConfiguration, Device, Logger, ModelSource, DIAGNOSTIC_TARGET};
use kernelforge_runtime::{Forge, Invocation};
use tracing::Metadata;
use tracing_subscriber::{filter::filter_fn, fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_directive())?;

    let device = parse_device(&cli.device)?;
    let invocation = Invocation {
        source: ModelSource::new(cli.model_path.clone()),
        engine_path: cli.engine_path.clone(),
        config: BuildConfiguration::new(cli.image_size)?.with_precision(cli.precision),
        rebuild: cli.rebuild,
    };

    let logger = Logger::tracing(cli.severity);
    let backend = OrtBackend::new(device);
    let importer = OnnxImporter::new();

    let report = Forge::new(&backend, &importer, &logger).run(&invocation)?;
    tracing::debug!(
        outcome = ?report.outcome,
        bindings = report.tensors.len(),
        path = %invocation.engine_path.display(),
        "done"
    );

    Ok(())
}

/// Diagnostic lines are printed bare; everything else gets the usual
/// timestamp, level and target.
fn init_tracing(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log directive `{directive}`"))?;

    let diagnostics = fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_filter(filter_fn(is_diagnostic));
    let events = fmt::layer().with_filter(filter_fn(|meta| !is_diagnostic(meta)));

    tracing_subscriber::registry()
        .with(filter)
        .with(diagnostics)
        .with(events)
        .init();
    Ok(())
}

fn is_diagnostic(meta: &Metadata<'_>) -> bool {
    meta.target() == DIAGNOSTIC_TARGET
}

fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    anyhow::bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}
