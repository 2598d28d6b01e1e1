use std::fmt;

use anyhow::Result;

use crate::{
    BuilderConfig, CompiledEngine, DataType, Dims, ModelSource, NetworkFlags, Severity,
    TensorDescriptor, TensorIOMode,
};

/// Graph being assembled for the builder.
pub trait NetworkDefinition {
    fn flags(&self) -> NetworkFlags;
    fn nb_inputs(&self) -> usize;
    fn input(&self, index: usize) -> Option<TensorDescriptor>;
}

/// A deserialized engine, queried by tensor name the way the runtime exposes it.
pub trait Engine {
    fn nb_io_tensors(&self) -> usize;
    fn io_tensor_name(&self, index: usize) -> Option<&str>;

    /// `TensorIOMode::None` for names the engine does not know.
    fn tensor_io_mode(&self, name: &str) -> TensorIOMode;
    fn tensor_shape(&self, name: &str) -> Dims;
    fn tensor_data_type(&self, name: &str) -> DataType;
}

/// Non-fatal problem reported while importing a model graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDiagnostic {
    pub desc: String,
}

impl ImportDiagnostic {
    pub fn new(desc: impl Into<String>) -> Self {
        Self { desc: desc.into() }
    }
}

impl fmt::Display for ImportDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.desc)
    }
}

pub trait ModelImporter {
    type Network: NetworkDefinition;

    /// Populates `network` from the model at `source`. Never fails outright:
    /// every problem comes back as a diagnostic.
    fn parse_from_file(
        &self,
        source: &ModelSource,
        network: &mut Self::Network,
        verbosity: Severity,
    ) -> Vec<ImportDiagnostic>;
}

/// Builder and runtime of one execution target.
pub trait Backend {
    type Network: NetworkDefinition;
    type Engine: Engine;

    fn name(&self) -> &'static str;
    fn create_network(&self, flags: NetworkFlags) -> Result<Self::Network>;
    fn platform_has_fast_fp16(&self) -> bool;

    /// `Ok(None)` means the builder ran but produced nothing.
    fn build_serialized_network(
        &self,
        network: &Self::Network,
        config: &BuilderConfig,
    ) -> Result<Option<CompiledEngine>>;

    fn deserialize_engine(&self, engine: &[u8]) -> Result<Self::Engine>;
}
