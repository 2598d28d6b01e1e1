//! Build settings: the per-invocation [`BuildConfiguration`] chosen on the
//! command line, and the [`BuilderConfig`] the pipeline derives from it for
//! a single call into the builder.

use std::fmt;
use std::str::FromStr;

use crate::{Dims, ForgeError, IOName, OptimizationProfile};

/// Workspace ceiling handed to the builder's kernel search (8 GiB).
pub const DEFAULT_WORKSPACE_BYTES: u64 = 1 << 33;

/// Channel count of the single image input.
pub const INPUT_CHANNELS: i64 = 3;

/// Compute precision requested for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionMode {
    /// Full 32-bit floating point only.
    Fp32,
    /// Enable 16-bit kernels when the platform has a fast path for them.
    /// Layers without an FP16 implementation still fall back to FP32.
    #[default]
    Fp16IfAvailable,
}

impl fmt::Display for PrecisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrecisionMode::Fp32 => "fp32",
            PrecisionMode::Fp16IfAvailable => "fp16",
        })
    }
}

impl FromStr for PrecisionMode {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fp32" => Ok(PrecisionMode::Fp32),
            "fp16" => Ok(PrecisionMode::Fp16IfAvailable),
            _ => Err(ForgeError::UnknownPrecision(s.to_string())),
        }
    }
}

/// Settings for one engine build. Constructed once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    image_size: u32,
    precision: PrecisionMode,
    workspace_bytes: u64,
}

impl BuildConfiguration {
    /// Configuration for a square `image_size` x `image_size` input.
    pub fn new(image_size: u32) -> Result<Self, ForgeError> {
        if image_size == 0 {
            return Err(ForgeError::InvalidImageSize(image_size));
        }
        Ok(Self {
            image_size,
            precision: PrecisionMode::default(),
            workspace_bytes: DEFAULT_WORKSPACE_BYTES,
        })
    }

    pub fn with_precision(mut self, precision: PrecisionMode) -> Self {
        self.precision = precision;
        self
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    pub fn precision(&self) -> PrecisionMode {
        self.precision
    }

    pub fn workspace_bytes(&self) -> u64 {
        self.workspace_bytes
    }

    /// The one input shape the engine supports: (1, 3, S, S).
    pub fn input_shape(&self) -> Dims {
        let s = i64::from(self.image_size);
        Dims::nchw(1, INPUT_CHANNELS, s, s)
    }

    pub fn profile_for(&self, input: IOName) -> OptimizationProfile {
        OptimizationProfile::fixed(input, self.input_shape())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderFlag {
    Fp16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryPoolType {
    Workspace,
}

/// Options used when creating a network definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkFlags {
    pub explicit_batch: bool,
}

impl NetworkFlags {
    pub const EXPLICIT_BATCH: Self = Self {
        explicit_batch: true,
    };
}

/// Configuration passed to [`crate::Backend::build_serialized_network`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    flags: Vec<BuilderFlag>,
    profiles: Vec<OptimizationProfile>,
    workspace_limit: Option<u64>,
}

impl BuilderConfig {
    pub fn set_flag(&mut self, flag: BuilderFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    pub fn has_flag(&self, flag: BuilderFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Registers a profile and returns its index.
    pub fn add_optimization_profile(&mut self, profile: OptimizationProfile) -> usize {
        self.profiles.push(profile);
        self.profiles.len() - 1
    }

    pub fn optimization_profiles(&self) -> &[OptimizationProfile] {
        &self.profiles
    }

    pub fn set_memory_pool_limit(&mut self, pool: MemoryPoolType, bytes: u64) {
        match pool {
            MemoryPoolType::Workspace => self.workspace_limit = Some(bytes),
        }
    }

    pub fn memory_pool_limit(&self, pool: MemoryPoolType) -> Option<u64> {
        match pool {
            MemoryPoolType::Workspace => self.workspace_limit,
        }
    }
}
