use kernelforge_core::{Engine, IOName, Logger, TensorDescriptor};

/// Prints the I/O layout of an engine through the diagnostic logger.
pub struct EngineReporter<'a> {
    logger: &'a Logger,
}

impl<'a> EngineReporter<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        Self { logger }
    }

    /// One line per tensor in engine order, then a summary line with the count.
    pub fn report<E: Engine + ?Sized>(&self, engine: &E) -> Vec<TensorDescriptor> {
        let count = engine.nb_io_tensors();
        let mut tensors = Vec::with_capacity(count);

        for index in 0..count {
            let name = engine.io_tensor_name(index).unwrap_or_default().to_string();
            let tensor = TensorDescriptor {
                mode: engine.tensor_io_mode(&name),
                shape: engine.tensor_shape(&name),
                dtype: engine.tensor_data_type(&name),
                name: IOName(name),
            };
            self.logger.info(binding_line(index, &tensor));
            tensors.push(tensor);
        }

        self.logger.info(summary_line(count));
        tensors
    }
}

pub fn binding_line(index: usize, tensor: &TensorDescriptor) -> String {
    format!(
        "Binding {index}: {} | Mode: {} | Dims: {} | DataType: {}",
        tensor.name, tensor.mode, tensor.shape, tensor.dtype
    )
}

pub fn summary_line(count: usize) -> String {
    format!("Engine created with {count} bindings.")
}
