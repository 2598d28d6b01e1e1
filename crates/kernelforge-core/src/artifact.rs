use std::path::{Path, PathBuf};

use bytes::Bytes;

/// A serialized model graph on disk, consumed only through a [`crate::ModelImporter`].
#[derive(Clone, Debug)]
pub struct ModelSource(pub PathBuf);

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Opaque, hardware-specific execution plan as produced by a builder.
///
/// The bytes are never interpreted here; they are written and read verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledEngine {
    bytes: Bytes,
}

impl CompiledEngine {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for CompiledEngine {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Bytes::from(bytes),
        }
    }
}

impl From<Bytes> for CompiledEngine {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}
