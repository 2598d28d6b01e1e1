//! Error taxonomy shared by every kernelforge crate.
//!
//! Collaborators return `anyhow::Result`; these variants are attached as the
//! error or as context so callers can tell failures apart with
//! `anyhow::Error::downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("failed to read engine file {}: {source}", .path.display())]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine file {} is empty", .0.display())]
    EmptyCacheEntry(PathBuf),

    #[error("network must expose exactly one input tensor, found {0}")]
    InputCount(usize),

    #[error("builder produced no serialized engine")]
    Build,

    #[error("failed to write engine file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deserialize engine")]
    Deserialize,

    #[error("image size must be a positive integer, got {0}")]
    InvalidImageSize(u32),

    #[error("unknown precision `{0}` (expected fp16 or fp32)")]
    UnknownPrecision(String),

    #[error("unknown severity `{0}` (expected internal-error, error, warning, info or verbose)")]
    UnknownSeverity(String),
}
