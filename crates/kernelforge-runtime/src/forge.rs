use std::path::PathBuf;

use anyhow::{Context, Result};
use kernelforge_core::{
    Backend, BuildConfiguration, ForgeError, Logger, ModelImporter, ModelSource, TensorDescriptor,
};
use tracing::debug;

use crate::{BuildPipeline, CacheStore, EngineReporter};

/// Everything one run of the tool needs to know.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub source: ModelSource,
    pub engine_path: PathBuf,
    pub config: BuildConfiguration,
    /// Skip the cache lookup and always build.
    pub rebuild: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    CacheHit,
    Built,
}

#[derive(Clone, Debug)]
pub struct ForgeReport {
    pub outcome: Outcome,
    pub tensors: Vec<TensorDescriptor>,
}

/// Cache lookup, then build on a miss, then report.
pub struct Forge<'a, B, I> {
    backend: &'a B,
    importer: &'a I,
    logger: &'a Logger,
}

impl<'a, B, I> Forge<'a, B, I>
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

    pub fn run(&self, invocation: &Invocation) -> Result<ForgeReport> {
        let cache = CacheStore::new(&invocation.engine_path);
        let reporter = EngineReporter::new(self.logger);

        if !invocation.rebuild && cache.exists() {
            self.logger.info(format!(
                "Engine file {} already exists. Remove it to create a new one.",
                cache.path().display()
            ));
            match cache.load() {
                Ok(plan) => {
                    let engine = self
                        .backend
                        .deserialize_engine(plan.as_bytes())
                        .context(ForgeError::Deserialize)?;
                    let tensors = reporter.report(&engine);
                    return Ok(ForgeReport {
                        outcome: Outcome::CacheHit,
                        tensors,
                    });
                }
                Err(err) => {
                    self.logger
                        .error(format!("Failed to read existing engine file: {err}"));
                }
            }
        }

        debug!(
            model = %invocation.source.path().display(),
            engine = %cache.path().display(),
            image_size = invocation.config.image_size(),
            "building engine"
        );
        let pipeline = BuildPipeline::new(self.backend, self.importer, self.logger);
        let engine = pipeline.build(&invocation.source, &invocation.config, &cache)?;
        let tensors = reporter.report(&engine);

        Ok(ForgeReport {
            outcome: Outcome::Built,
            tensors,
        })
    }
}
