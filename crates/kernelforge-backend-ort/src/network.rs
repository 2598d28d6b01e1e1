use std::fs;

use bytes::Bytes;
use kernelforge_core::{
    ImportDiagnostic, ModelImporter, ModelSource, NetworkDefinition, NetworkFlags, Severity,
    TensorDescriptor, TensorIOMode,
};
use ort::{
    logging::LogLevel,
    session::{builder::GraphOptimizationLevel, Session},
};

use crate::convert::{opaque_slot, slot_from_value_type, SlotInfo};

/// An imported ONNX graph waiting to be compiled.
#[derive(Debug, Default)]
pub struct OrtNetwork {
    flags: NetworkFlags,
    model: Option<Bytes>,
    inputs: Vec<SlotInfo>,
    outputs: Vec<SlotInfo>,
}

impl OrtNetwork {
    pub fn new(flags: NetworkFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    pub fn model(&self) -> Option<&[u8]> {
        self.model.as_deref()
    }

    pub fn inputs(&self) -> &[SlotInfo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SlotInfo] {
        &self.outputs
    }

    pub fn input_named(&self, name: &str) -> Option<&SlotInfo> {
        self.inputs.iter().find(|slot| slot.descriptor.name.0 == name)
    }
}

impl NetworkDefinition for OrtNetwork {
    fn flags(&self) -> NetworkFlags {
        self.flags
    }

    fn nb_inputs(&self) -> usize {
        self.inputs.len()
    }

    fn input(&self, index: usize) -> Option<TensorDescriptor> {
        self.inputs.get(index).map(|slot| slot.descriptor.clone())
    }
}

/// Reads an ONNX file into an [`OrtNetwork`].
///
/// The graph is loaded once without optimizations to learn its I/O
/// signature; problems are returned as diagnostics and whatever could be read
/// is kept.
#[derive(Clone, Copy, Debug, Default)]
pub struct OnnxImporter;

impl OnnxImporter {
    pub fn new() -> Self {
        Self
    }
}

impl ModelImporter for OnnxImporter {
    type Network = OrtNetwork;

    fn parse_from_file(
        &self,
        source: &ModelSource,
        network: &mut OrtNetwork,
        verbosity: Severity,
    ) -> Vec<ImportDiagnostic> {
        let mut diagnostics = Vec::new();

        let bytes = match fs::read(source.path()) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                diagnostics.push(ImportDiagnostic::new(format!(
                    "failed to read model {}: {err}",
                    source.path().display()
                )));
                return diagnostics;
            }
        };

        let session = Session::builder()
            .and_then(|b| b.with_log_level(ort_log_level(verbosity)))
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Disable))
            .and_then(|b| b.commit_from_memory(&bytes));
        network.model = Some(bytes.clone());

        let session = match session {
            Ok(session) => session,
            Err(err) => {
                diagnostics.push(ImportDiagnostic::new(format!(
                    "failed to parse model {}: {err}",
                    source.path().display()
                )));
                return diagnostics;
            }
        };

        for input in &session.inputs {
            match slot_from_value_type(&input.name, TensorIOMode::Input, &input.input_type) {
                Some(slot) => network.inputs.push(slot),
                None => {
                    diagnostics.push(ImportDiagnostic::new(format!(
                        "input `{}` is not a tensor",
                        input.name
                    )));
                    network.inputs.push(opaque_slot(&input.name, TensorIOMode::Input));
                }
            }
        }
        for output in &session.outputs {
            match slot_from_value_type(&output.name, TensorIOMode::Output, &output.output_type) {
                Some(slot) => network.outputs.push(slot),
                None => {
                    diagnostics.push(ImportDiagnostic::new(format!(
                        "output `{}` is not a tensor",
                        output.name
                    )));
                    network.outputs.push(opaque_slot(&output.name, TensorIOMode::Output));
                }
            }
        }

        diagnostics
    }
}

fn ort_log_level(severity: Severity) -> LogLevel {
    match severity {
        Severity::InternalError => LogLevel::Fatal,
        Severity::Error => LogLevel::Error,
        Severity::Warning => LogLevel::Warning,
        Severity::Info => LogLevel::Info,
        Severity::Verbose => LogLevel::Verbose,
    }
}
