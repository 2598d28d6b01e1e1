//! ONNX Runtime implementation of the kernelforge builder, runtime and
//! importer.
//!
//! On the CPU the plan is the model after hardware-specific (level 3) graph
//! optimization with the profile's shape baked in through free-dimension
//! overrides. On CUDA the TensorRT execution provider compiles the graph and
//! the plan is an EP-context model carrying the serialized TensorRT engine.

mod convert;
mod engine;
mod network;

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use kernelforge_core::{
    Backend, BuilderConfig, CompiledEngine, Device, Engine, NetworkFlags, OptimizationProfile,
};
use ort::session::{
    builder::{GraphOptimizationLevel, SessionBuilder},
    Session,
};
use tracing::debug;

pub use convert::SlotInfo;
pub use engine::OrtEngine;
pub use network::{OnnxImporter, OrtNetwork};

pub struct OrtBackend {
    device: Device,
}

impl OrtBackend {
    pub fn new(device: Device) -> Self {
        Self { device }
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new(Device::Cpu)
    }
}

impl Backend for OrtBackend {
    type Network = OrtNetwork;
    type Engine = OrtEngine;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn create_network(&self, flags: NetworkFlags) -> Result<OrtNetwork> {
        ensure!(
            flags.explicit_batch,
            "onnxruntime networks always carry an explicit batch dimension"
        );
        Ok(OrtNetwork::new(flags))
    }

    fn platform_has_fast_fp16(&self) -> bool {
        match self.device {
            Device::Cpu => false,
            Device::Cuda { .. } => tensorrt_available(),
        }
    }

    fn build_serialized_network(
        &self,
        network: &OrtNetwork,
        config: &BuilderConfig,
    ) -> Result<Option<CompiledEngine>> {
        let Some(model) = network.model() else {
            return Ok(None);
        };

        let plan = tempfile::Builder::new()
            .prefix("kernelforge-")
            .suffix(".onnx")
            .tempfile()
            .context("failed to create scratch file for the compiled plan")?;

        let mut builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        for profile in config.optimization_profiles() {
            builder = pin_profile(builder, network, profile)?;
        }

        let builder = match &self.device {
            Device::Cpu => builder
                .with_optimized_model_path(plan.path())
                .context("failed to set optimized model path")?,
            Device::Cuda { device_id } => {
                configure_tensorrt(builder, *device_id, config, Some(plan.path()))?
            }
        };

        debug!(device = ?self.device, plan = %plan.path().display(), "compiling model");
        let session = builder
            .commit_from_memory(model)
            .context("failed to compile ONNX model")?;
        drop(session);

        let bytes = fs::read(plan.path()).context("failed to read compiled plan")?;
        if bytes.is_empty() {
            return Ok(None);
        }
        if self.device == Device::Cpu {
            check_pinned(&bytes, config.optimization_profiles())?;
        }
        Ok(Some(CompiledEngine::from(bytes)))
    }

    fn deserialize_engine(&self, engine: &[u8]) -> Result<OrtEngine> {
        let builder = Session::builder().context("failed to create ORT session builder")?;
        let builder = match &self.device {
            Device::Cpu => builder,
            Device::Cuda { device_id } => {
                configure_tensorrt(builder, *device_id, &BuilderConfig::default(), None)?
            }
        };
        let session = builder
            .commit_from_memory(engine)
            .context("failed to load compiled plan")?;
        Ok(OrtEngine::from_session(session))
    }
}

/// Fixes every axis of the profiled input to the profile's shape. Symbolic
/// axes are overridden by name; static axes must already agree.
fn pin_profile(
    mut builder: SessionBuilder,
    network: &OrtNetwork,
    profile: &OptimizationProfile,
) -> Result<SessionBuilder> {
    let slot = network
        .input_named(&profile.input.0)
        .with_context(|| format!("profile input `{}` is not a network input", profile.input))?;
    let dims = slot.descriptor.shape.as_slice();
    let wanted = profile.opt.as_slice();
    ensure!(
        dims.len() == wanted.len(),
        "input `{}` has rank {} but the optimization profile has rank {}",
        profile.input,
        dims.len(),
        wanted.len()
    );

    let axes = dims.iter().zip(wanted).zip(&slot.symbols);
    for (axis, ((&dim, &want), symbol)) in axes.enumerate() {
        if dim >= 0 {
            ensure!(
                dim == want,
                "input `{}` axis {axis} is fixed at {dim} but the optimization profile requires {want}",
                profile.input
            );
            continue;
        }
        if symbol.is_empty() {
            bail!(
                "input `{}` axis {axis} is dynamic without a symbolic name and cannot be pinned to {want}",
                profile.input
            );
        }
        builder = builder
            .with_dimension_override(symbol, want)
            .with_context(|| format!("failed to pin dimension `{symbol}` to {want}"))?;
    }

    Ok(builder)
}

/// Reloads a CPU plan without overrides and checks that every profiled input
/// kept the shape it was pinned to.
fn check_pinned(plan: &[u8], profiles: &[OptimizationProfile]) -> Result<()> {
    let session = Session::builder()
        .context("failed to create ORT session builder")?
        .with_optimization_level(GraphOptimizationLevel::Disable)
        .context("failed to configure ORT session builder")?
        .commit_from_memory(plan)
        .context("failed to reload compiled plan")?;
    let engine = OrtEngine::from_session(session);

    for profile in profiles {
        let shape = engine.tensor_shape(&profile.input.0);
        ensure!(
            shape == profile.opt,
            "compiled plan has input `{}` shaped {shape}, expected {}",
            profile.input,
            profile.opt
        );
    }
    Ok(())
}

fn tensorrt_available() -> bool {
    use ort::execution_providers::{ExecutionProvider, TensorRTExecutionProvider};

    TensorRTExecutionProvider::default()
        .is_available()
        .unwrap_or(false)
}

fn configure_tensorrt(
    builder: SessionBuilder,
    device_id: u32,
    config: &BuilderConfig,
    context_model: Option<&Path>,
) -> Result<SessionBuilder> {
    #[cfg(feature = "tensorrt")]
    {
        use kernelforge_core::{BuilderFlag, MemoryPoolType};
        use ort::execution_providers::TensorRTExecutionProvider;

        let mut ep = TensorRTExecutionProvider::default()
            .with_device_id(device_id as i32)
            .with_fp16(config.has_flag(BuilderFlag::Fp16));

        if let Some(limit) = config.memory_pool_limit(MemoryPoolType::Workspace) {
            ep = ep.with_max_workspace_size(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        if let Some(profile) = config.optimization_profiles().first() {
            ep = ep
                .with_profile_min_shapes(convert::provider_shape(&profile.input, &profile.min))
                .with_profile_opt_shapes(convert::provider_shape(&profile.input, &profile.opt))
                .with_profile_max_shapes(convert::provider_shape(&profile.input, &profile.max));
        }
        if let Some(path) = context_model {
            ep = ep
                .with_dump_ep_context_model(true)
                .with_ep_context_file_path(path.display())
                .with_ep_context_embed_mode(1);
        }

        builder
            .with_execution_providers([ep.build().error_on_failure()])
            .context("failed to enable ORT TensorRT execution provider")
    }
    #[cfg(not(feature = "tensorrt"))]
    {
        let _ = (builder, device_id, config, context_model);
        bail!("CUDA requested but kernelforge-backend-ort was built without the `tensorrt` feature")
    }
}
