use kernelforge_core::{DataType, Dims, IOName, TensorDescriptor, TensorIOMode};
use ort::{tensor::TensorElementType, value::ValueType};

/// An I/O slot as ONNX Runtime describes it, with the symbolic name of each
/// axis (empty when the axis has none).
#[derive(Clone, Debug)]
pub struct SlotInfo {
    pub descriptor: TensorDescriptor,
    pub symbols: Vec<String>,
}

pub(crate) fn slot_from_value_type(
    name: &str,
    mode: TensorIOMode,
    value_type: &ValueType,
) -> Option<SlotInfo> {
    let ValueType::Tensor {
        ty,
        shape,
        dimension_symbols,
    } = value_type
    else {
        return None;
    };

    let dims = shape
        .iter()
        .map(|d| if *d < 0 { Dims::DYNAMIC } else { *d })
        .collect::<Vec<_>>();
    let mut symbols = dimension_symbols.iter().cloned().collect::<Vec<_>>();
    symbols.resize(dims.len(), String::new());

    Some(SlotInfo {
        descriptor: TensorDescriptor {
            name: IOName(name.to_string()),
            mode,
            shape: Dims::from_slice(&dims),
            dtype: ort_tensor_element_to_dtype(*ty),
        },
        symbols,
    })
}

/// Descriptor for a slot that is not a plain tensor (sequence, map, ...).
pub(crate) fn opaque_slot(name: &str, mode: TensorIOMode) -> SlotInfo {
    SlotInfo {
        descriptor: TensorDescriptor {
            name: IOName(name.to_string()),
            mode,
            shape: Dims::default(),
            dtype: DataType::Unknown,
        },
        symbols: Vec::new(),
    }
}

pub(crate) fn ort_tensor_element_to_dtype(ty: TensorElementType) -> DataType {
    match ty {
        TensorElementType::Float32 => DataType::Float32,
        TensorElementType::Float16 => DataType::Float16,
        TensorElementType::Int8 => DataType::Int8,
        TensorElementType::Int32 => DataType::Int32,
        TensorElementType::Bool => DataType::Bool,
        TensorElementType::Uint8 => DataType::Uint8,
        TensorElementType::Float8E4M3FN
        | TensorElementType::Float8E4M3FNUZ
        | TensorElementType::Float8E5M2
        | TensorElementType::Float8E5M2FNUZ => DataType::Fp8,
        TensorElementType::Bfloat16 => DataType::Bf16,
        TensorElementType::Int64 => DataType::Int64,
        TensorElementType::Int4 => DataType::Int4,
        _ => DataType::Unknown,
    }
}

/// `name:1x3x640x640`, the shape syntax the TensorRT provider options expect.
#[cfg(any(test, feature = "tensorrt"))]
pub(crate) fn provider_shape(input: &IOName, dims: &Dims) -> String {
    format!("{input}:{dims}")
}
