use anyhow::{ensure, Context, Result};
use kernelforge_core::{
    Backend, BuildConfiguration, BuilderConfig, BuilderFlag, ForgeError, Logger, MemoryPoolType,
    ModelImporter, ModelSource, NetworkDefinition, NetworkFlags, PrecisionMode, Severity,
};
use tracing::debug;

use crate::CacheStore;

/// Turns a model source into a persisted engine.
///
/// Every stage runs once; any failure ends the build. Only the importer's
/// diagnostics are tolerated, and those are logged as errors.
pub struct BuildPipeline<'a, B, I> {
    backend: &'a B,
    importer: &'a I,
    logger: &'a Logger,
}

impl<'a, B, I> BuildPipeline<'a, B, I>
where
    B: Backend,
    I: ModelImporter<Network = B::Network>,
{
    pub fn new(backend: &'a B, importer: &'a I, logger: &'a Logger) -> Self {
        Self {
            backend,
            importer,
            logger,
        }
    }

    pub fn build(
        &self,
        source: &ModelSource,
        config: &BuildConfiguration,
        cache: &CacheStore,
    ) -> Result<B::Engine> {
        let mut network = self
            .backend
            .create_network(NetworkFlags::EXPLICIT_BATCH)
            .context("failed to create network definition")?;
        ensure!(
            network.flags().explicit_batch,
            "{} backend returned an implicit-batch network",
            self.backend.name()
        );

        let diagnostics = self
            .importer
            .parse_from_file(source, &mut network, Severity::Info);
        for diagnostic in &diagnostics {
            self.logger.error(diagnostic.to_string());
        }

        let builder_config = self.configure(&network, config)?;

        self.logger.info(format!(
            "Building engine with the {} backend; this may take a while",
            self.backend.name()
        ));
        let engine = self
            .backend
            .build_serialized_network(&network, &builder_config)
            .context("engine build failed")?
            .ok_or(ForgeError::Build)?;

        cache.store(&engine)?;
        self.logger.info(format!(
            "Engine written to {} ({} bytes)",
            cache.path().display(),
            engine.len()
        ));

        self.backend
            .deserialize_engine(engine.as_bytes())
            .context(ForgeError::Deserialize)
    }

    /// Precision, optimization profile and workspace for one build.
    pub fn configure(
        &self,
        network: &B::Network,
        config: &BuildConfiguration,
    ) -> Result<BuilderConfig> {
        let mut builder_config = BuilderConfig::default();

        match config.precision() {
            PrecisionMode::Fp32 => self.logger.info("FP16 disabled by configuration"),
            PrecisionMode::Fp16IfAvailable => {
                if self.backend.platform_has_fast_fp16() {
                    builder_config.set_flag(BuilderFlag::Fp16);
                    self.logger.info("FP16 supported");
                } else {
                    self.logger.info("FP16 not supported");
                }
            }
        }

        let nb_inputs = network.nb_inputs();
        if nb_inputs != 1 {
            return Err(ForgeError::InputCount(nb_inputs).into());
        }
        let input = network.input(0).ok_or(ForgeError::InputCount(0))?;

        let profile = config.profile_for(input.name);
        self.logger.verbose(format!("Optimization profile {profile}"));
        builder_config.add_optimization_profile(profile);

        builder_config.set_memory_pool_limit(MemoryPoolType::Workspace, config.workspace_bytes());
        debug!(
            workspace_bytes = config.workspace_bytes(),
            fp16 = builder_config.has_flag(BuilderFlag::Fp16),
            "builder configured"
        );

        Ok(builder_config)
    }
}
