use std::fmt;

use crate::{DataType, Dims, TensorIOMode};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IOName(pub String);

impl fmt::Display for IOName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only view of one engine (or network) I/O slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDescriptor {
    pub name: IOName,
    pub mode: TensorIOMode,
    pub shape: Dims,
    pub dtype: DataType,
}

/// Shape range an engine must support for one input. Here min, opt and max
/// always collapse to a single shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptimizationProfile {
    pub input: IOName,
    pub min: Dims,
    pub opt: Dims,
    pub max: Dims,
}

impl OptimizationProfile {
    pub fn fixed(input: IOName, shape: Dims) -> Self {
        Self {
            input,
            min: shape.clone(),
            opt: shape.clone(),
            max: shape,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.opt && self.opt == self.max
    }
}

impl fmt::Display for OptimizationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: min {} | opt {} | max {}",
            self.input, self.min, self.opt, self.max
        )
    }
}
