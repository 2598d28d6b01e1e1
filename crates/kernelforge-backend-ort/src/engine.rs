use kernelforge_core::{DataType, Dims, Engine, TensorDescriptor, TensorIOMode};
use ort::session::Session;

use crate::convert::{opaque_slot, slot_from_value_type};

/// A compiled plan loaded into an ONNX Runtime session.
pub struct OrtEngine {
    tensors: Vec<TensorDescriptor>,
    _session: Session,
}

impl OrtEngine {
    pub(crate) fn from_session(session: Session) -> Self {
        let inputs = session.inputs.iter().map(|input| {
            slot_from_value_type(&input.name, TensorIOMode::Input, &input.input_type)
                .unwrap_or_else(|| opaque_slot(&input.name, TensorIOMode::Input))
        });
        let outputs = session.outputs.iter().map(|output| {
            slot_from_value_type(&output.name, TensorIOMode::Output, &output.output_type)
                .unwrap_or_else(|| opaque_slot(&output.name, TensorIOMode::Output))
        });
        let tensors = inputs.chain(outputs).map(|slot| slot.descriptor).collect();

        Self {
            tensors,
            _session: session,
        }
    }

    fn find(&self, name: &str) -> Option<&TensorDescriptor> {
        self.tensors.iter().find(|t| t.name.0 == name)
    }
}

impl Engine for OrtEngine {
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
