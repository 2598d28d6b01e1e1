#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use anyhow::{ensure, Result};
use kernelforge_core::{
    Backend, BuilderConfig, CompiledEngine, DataType, Dims, Engine, IOName, ImportDiagnostic,
    Logger, MemorySink, ModelImporter, ModelSource, NetworkDefinition, NetworkFlags, Severity,
    TensorDescriptor, TensorIOMode,
};

pub const PLAN_MAGIC: &[u8] = b"FAKEPLAN";

pub fn tensor(name: &str, mode: TensorIOMode, shape: &[i64], dtype: DataType) -> TensorDescriptor {
    TensorDescriptor {
        name: IOName(name.to_string()),
        mode,
        shape: Dims::from_slice(shape),
        dtype,
    }
}

pub fn yolo_tensors() -> Vec<TensorDescriptor> {
    vec![
        tensor("images", TensorIOMode::Input, &[1, 3, 640, 640], DataType::Float32),
        tensor("output0", TensorIOMode::Output, &[1, 84, 8400], DataType::Float16),
    ]
}

pub fn memory_logger(threshold: Severity) -> (Logger, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (Logger::new(threshold, sink.clone()), sink)
}

pub fn plan_bytes(tag: &str) -> Vec<u8> {
    let mut bytes = PLAN_MAGIC.to_vec();
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

#[derive(Debug, Default)]
pub struct FakeNetwork {
    pub flags: NetworkFlags,
    pub inputs: Vec<TensorDescriptor>,
}

impl NetworkDefinition for FakeNetwork {
    fn flags(&self) -> NetworkFlags {
        self.flags
    }

    fn nb_inputs(&self) -> usize {
        self.inputs.len()
    }

    fn input(&self, index: usize) -> Option<TensorDescriptor> {
        self.inputs.get(index).cloned()
    }
}

pub struct FakeImporter {
    pub inputs: Vec<TensorDescriptor>,
    pub diagnostics: Vec<String>,
    pub calls: Cell<usize>,
}

impl FakeImporter {
    pub fn single_input() -> Self {
        Self::with_inputs(vec![tensor(
            "images",
            TensorIOMode::Input,
            &[-1, 3, -1, -1],
            DataType::Float32,
        )])
    }

    pub fn with_inputs(inputs: Vec<TensorDescriptor>) -> Self {
        Self {
            inputs,
            diagnostics: Vec::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: &[&str]) -> Self {
        self.diagnostics = diagnostics.iter().map(|d| d.to_string()).collect();
        self
    }
}

impl ModelImporter for FakeImporter {
    type Network = FakeNetwork;

    fn parse_from_file(
        &self,
        _source: &ModelSource,
        network: &mut FakeNetwork,
        _verbosity: Severity,
    ) -> Vec<ImportDiagnostic> {
        self.calls.set(self.calls.get() + 1);
        network.inputs.extend(self.inputs.iter().cloned());
        self.diagnostics
            .iter()
            .map(|d| ImportDiagnostic::new(d.clone()))
            .collect()
    }
}

pub struct FakeEngine {
    tensors: Vec<TensorDescriptor>,
}

impl FakeEngine {
    fn find(&self, name: &str) -> Option<&TensorDescriptor> {
        self.tensors.iter().find(|t| t.name.0 == name)
    }
}

impl Engine for FakeEngine {
    fn nb_io_tensors(&self) -> usize {
        self.tensors.len()
    }

    fn io_tensor_name(&self, index: usize) -> Option<&str> {
        self.tensors.get(index).map(|t| t.name.0.as_str())
    }

    fn tensor_io_mode(&self, name: &str) -> TensorIOMode {
        self.find(name).map_or(TensorIOMode::None, |t| t.mode)
    }

    fn tensor_shape(&self, name: &str) -> Dims {
        self.find(name).map(|t| t.shape.clone()).unwrap_or_default()
    }

    fn tensor_data_type(&self, name: &str) -> DataType {
        self.find(name).map_or(DataType::Unknown, |t| t.dtype)
    }
}

pub fn engine_with(tensors: Vec<TensorDescriptor>) -> FakeEngine {
    FakeEngine { tensors }
}

pub struct FakeBackend {
    pub fast_fp16: bool,
    pub produces_engine: bool,
    pub implicit_batch: bool,
    pub engine_tensors: Vec<TensorDescriptor>,
    pub network_flags: Cell<Option<NetworkFlags>>,
    pub fp16_queries: Cell<usize>,
    pub build_calls: Cell<usize>,
    pub deserialize_calls: Cell<usize>,
    pub last_config: RefCell<Option<BuilderConfig>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            fast_fp16: true,
            produces_engine: true,
            implicit_batch: false,
            engine_tensors: yolo_tensors(),
            network_flags: Cell::new(None),
            fp16_queries: Cell::new(0),
            build_calls: Cell::new(0),
            deserialize_calls: Cell::new(0),
            last_config: RefCell::new(None),
        }
    }

    pub fn without_fp16(mut self) -> Self {
        self.fast_fp16 = false;
        self
    }

    pub fn producing_nothing(mut self) -> Self {
        self.produces_engine = false;
        self
    }

    pub fn with_implicit_batch(mut self) -> Self {
        self.implicit_batch = true;
        self
    }

    pub fn config(&self) -> BuilderConfig {
        self.last_config
            .borrow()
            .clone()
            .expect("builder was never invoked")
    }
}

impl Backend for FakeBackend {
    type Network = FakeNetwork;
    type Engine = FakeEngine;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn create_network(&self, flags: NetworkFlags) -> Result<FakeNetwork> {
        self.network_flags.set(Some(flags));
        let flags = if self.implicit_batch {
            NetworkFlags::default()
        } else {
            flags
        };
        Ok(FakeNetwork {
            flags,
            inputs: Vec::new(),
        })
    }

    fn platform_has_fast_fp16(&self) -> bool {
        self.fp16_queries.set(self.fp16_queries.get() + 1);
        self.fast_fp16
    }

    fn build_serialized_network(
        &self,
        network: &FakeNetwork,
        config: &BuilderConfig,
    ) -> Result<Option<CompiledEngine>> {
        self.build_calls.set(self.build_calls.get() + 1);
        *self.last_config.borrow_mut() = Some(config.clone());
        if !self.produces_engine {
            return Ok(None);
        }
        let tag = network
            .inputs
            .first()
            .map(|t| t.name.0.clone())
            .unwrap_or_default();
        Ok(Some(CompiledEngine::from(plan_bytes(&tag))))
    }

    fn deserialize_engine(&self, engine: &[u8]) -> Result<FakeEngine> {
        self.deserialize_calls.set(self.deserialize_calls.get() + 1);
        ensure!(engine.starts_with(PLAN_MAGIC), "not a serialized plan");
        Ok(engine_with(self.engine_tensors.clone()))
    }
}
