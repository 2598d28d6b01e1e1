use std::path::PathBuf;

use clap::Parser;
use kernelforge_core::{PrecisionMode, Severity};

#[derive(Parser, Debug)]
#[command(
    name = "kernelforge",
    version,
    about = "Compile an ONNX model into a cached inference engine"
)]
pub struct Cli {
    /// Path to the ONNX model
    pub model_path: PathBuf,

    /// Where the compiled engine is cached
    pub engine_path: PathBuf,

    /// Square input resolution; the engine is built for 1x3xSIZExSIZE
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub image_size: u32,

    /// Tracing filter directive (RUST_LOG syntax); derived from --severity when unset
    #[arg(long)]
    pub log: Option<String>,

    /// Diagnostic threshold (internal-error, error, warning, info, verbose)
    #[arg(long, default_value = "info")]
    pub severity: Severity,

    /// Target device (cpu or cuda:N)
    #[arg(long, default_value = "cpu")]
    pub device: String,

    /// Precision mode (fp16 uses half precision when the platform supports it)
    #[arg(long, default_value = "fp16")]
    pub precision: PrecisionMode,

    /// Rebuild even if a cached engine exists
    #[arg(long)]
    pub rebuild: bool,
}

impl Cli {
    /// The `--log` directive, or the tracing level matching `--severity`.
    pub fn log_directive(&self) -> String {
        match &self.log {
            Some(directive) => directive.clone(),
            None => severity_directive(self.severity).to_string(),
        }
    }
}

fn severity_directive(severity: Severity) -> &'static str {
    match severity {
        Severity::InternalError | Severity::Error => "error",
        Severity::Warning => "warn",
        Severity::Info => "info",
        Severity::Verbose => "debug",
    }
}
