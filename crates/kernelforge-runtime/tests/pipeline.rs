mod support;

use anyhow::{Context, Result};
use kernelforge_core::{
    BuildConfiguration, BuilderFlag, DataType, Dims, ForgeError, MemoryPoolType, ModelSource,
    NetworkFlags, PrecisionMode, Severity, TensorIOMode,
};
use kernelforge_runtime::{BuildPipeline, CacheStore};
use support::{memory_logger, tensor, FakeBackend, FakeImporter, FakeNetwork};
use tempfile::TempDir;

fn network_with_single_input() -> FakeNetwork {
    FakeNetwork {
        flags: NetworkFlags::EXPLICIT_BATCH,
        inputs: vec![tensor(
            "images",
            TensorIOMode::Input,
            &[-1, 3, -1, -1],
            DataType::Float32,
        )],
    }
}

#[test]
fn profile_pins_min_opt_max_to_one_square_shape() -> Result<()> {
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);
    let network = network_with_single_input();

    for size in [1u32, 32, 320, 640, 1280, 4096] {
        let config = pipeline.configure(&network, &BuildConfiguration::new(size)?)?;
        let profiles = config.optimization_profiles();
        assert_eq!(profiles.len(), 1);

        let profile = &profiles[0];
        let expected = Dims::nchw(1, 3, i64::from(size), i64::from(size));
        assert_eq!(profile.input.0, "images");
        assert_eq!(profile.min, expected);
        assert_eq!(profile.opt, expected);
        assert_eq!(profile.max, expected);
        assert!(profile.is_fixed());
    }
    Ok(())
}

#[test]
fn fp16_is_enabled_when_the_platform_supports_it() -> Result<()> {
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input();
    let (logger, sink) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    let config = pipeline.configure(&network_with_single_input(), &BuildConfiguration::new(640)?)?;

    assert!(config.has_flag(BuilderFlag::Fp16));
    assert!(sink.messages().contains(&"FP16 supported".to_string()));
    Ok(())
}

#[test]
fn fp16_stays_off_without_platform_support() -> Result<()> {
    let backend = FakeBackend::new().without_fp16();
    let importer = FakeImporter::single_input();
    let (logger, sink) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    let config = pipeline.configure(&network_with_single_input(), &BuildConfiguration::new(640)?)?;

    assert!(!config.has_flag(BuilderFlag::Fp16));
    assert!(sink.messages().contains(&"FP16 not supported".to_string()));
    Ok(())
}

#[test]
fn fp32_precision_never_queries_the_platform() -> Result<()> {
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);
    let build = BuildConfiguration::new(640)?.with_precision(PrecisionMode::Fp32);

    let config = pipeline.configure(&network_with_single_input(), &build)?;

    assert!(!config.has_flag(BuilderFlag::Fp16));
    assert_eq!(backend.fp16_queries.get(), 0);
    Ok(())
}

#[test]
fn workspace_limit_is_eight_gib() -> Result<()> {
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    let config = pipeline.configure(&network_with_single_input(), &BuildConfiguration::new(320)?)?;

    assert_eq!(
        config.memory_pool_limit(MemoryPoolType::Workspace),
        Some(1u64 << 33)
    );
    Ok(())
}

#[test]
fn network_without_exactly_one_input_is_rejected() -> Result<()> {
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);
    let build = BuildConfiguration::new(640)?;

    let empty = FakeNetwork::default();
    let err = pipeline.configure(&empty, &build).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ForgeError>(),
        Some(ForgeError::InputCount(0))
    ));

    let mut two = network_with_single_input();
    two.inputs.push(tensor("mask", TensorIOMode::Input, &[1, 1], DataType::Bool));
    let err = pipeline.configure(&two, &build).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ForgeError>(),
        Some(ForgeError::InputCount(2))
    ));
    Ok(())
}

#[test]
fn build_persists_engine_and_round_trips_it() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.engine");
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    let engine = pipeline.build(
        &ModelSource::new("model.onnx"),
        &BuildConfiguration::new(640)?,
        &CacheStore::new(&path),
    )?;

    let written = std::fs::read(&path).context("engine file missing")?;
    assert!(!written.is_empty());
    assert_eq!(written, support::plan_bytes("images"));
    assert_eq!(backend.network_flags.get(), Some(NetworkFlags::EXPLICIT_BATCH));
    assert_eq!(backend.deserialize_calls.get(), 1);
    assert_eq!(kernelforge_core::Engine::nb_io_tensors(&engine), 2);
    Ok(())
}

#[test]
fn import_diagnostics_are_logged_without_stopping_the_build() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.engine");
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input()
        .with_diagnostics(&["unsupported attribute on node 7", "initializer truncated"]);
    let (logger, sink) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    pipeline.build(
        &ModelSource::new("model.onnx"),
        &BuildConfiguration::new(640)?,
        &CacheStore::new(&path),
    )?;

    let errors: Vec<String> = sink
        .lines()
        .into_iter()
        .filter(|(severity, _)| *severity == Severity::Error)
        .map(|(_, message)| message)
        .collect();
    assert_eq!(
        errors,
        vec!["unsupported attribute on node 7", "initializer truncated"]
    );
    assert_eq!(backend.build_calls.get(), 1);
    assert!(path.is_file());
    Ok(())
}

#[test]
fn empty_builder_output_is_fatal_and_writes_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.engine");
    let backend = FakeBackend::new().producing_nothing();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    let err = pipeline
        .build(
            &ModelSource::new("model.onnx"),
            &BuildConfiguration::new(640)?,
            &CacheStore::new(&path),
        )
        .err()
        .context("build should fail")?;

    assert!(matches!(err.downcast_ref::<ForgeError>(), Some(ForgeError::Build)));
    assert!(!path.exists());
    assert_eq!(backend.deserialize_calls.get(), 0);
    Ok(())
}

#[test]
fn unwritable_destination_aborts_before_deserializing() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("missing").join("model.engine");
    let backend = FakeBackend::new();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    let err = pipeline
        .build(
            &ModelSource::new("model.onnx"),
            &BuildConfiguration::new(640)?,
            &CacheStore::new(&path),
        )
        .err()
        .context("build should fail")?;

    assert!(matches!(
        err.downcast_ref::<ForgeError>(),
        Some(ForgeError::Io { .. })
    ));
    assert_eq!(backend.deserialize_calls.get(), 0);
    Ok(())
}

#[test]
fn implicit_batch_network_is_rejected_before_import() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.engine");
    let backend = FakeBackend::new().with_implicit_batch();
    let importer = FakeImporter::single_input();
    let (logger, _) = memory_logger(Severity::Info);
    let pipeline = BuildPipeline::new(&backend, &importer, &logger);

    let err = pipeline
        .build(
            &ModelSource::new("model.onnx"),
            &BuildConfiguration::new(640)?,
            &CacheStore::new(&path),
        )
        .err()
        .context("build should fail")?;

    assert!(err.to_string().contains("implicit-batch"));
    assert_eq!(backend.network_flags.get(), Some(NetworkFlags::EXPLICIT_BATCH));
    assert_eq!(importer.calls.get(), 0);
    assert_eq!(backend.build_calls.get(), 0);
    assert!(!path.exists());
    Ok(())
}
