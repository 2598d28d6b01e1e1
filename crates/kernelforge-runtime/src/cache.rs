use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use kernelforge_core::{CompiledEngine, ForgeError};
use tempfile::NamedTempFile;
use tracing::debug;

/// Serialized engine cache keyed by file path alone.
///
/// Nothing ties an entry to the model or configuration it was built from: a
/// file that exists is taken as the engine to use.
#[derive(Clone, Debug)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<CompiledEngine, ForgeError> {
        let bytes = fs::read(&self.path).map_err(|source| ForgeError::CacheRead {
            path: self.path.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(ForgeError::EmptyCacheEntry(self.path.clone()));
        }
        debug!(path = %self.path.display(), bytes = bytes.len(), "loaded cached engine");
        Ok(CompiledEngine::from(bytes))
    }

    /// Writes `engine` over the cache path. The bytes land in a sibling
    /// temporary file first and are renamed into place, so the path holds
    /// either the old content or the complete new engine.
    pub fn store(&self, engine: &CompiledEngine) -> Result<(), ForgeError> {
        let io_err = |source: std::io::Error| ForgeError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir).map_err(io_err)?;
        staged.write_all(engine.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged.persist(&self.path).map_err(|err| io_err(err.error))?;

        debug!(path = %self.path.display(), bytes = engine.len(), "engine persisted");
        Ok(())
    }
}
