//! Artifact writers.
//!
//! A sink receives one cleaned payload per chunk index and makes it durable.
//! Sinks are shared between worker threads, so every write must be
//! self-contained: distinct indices never touch the same path.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::SinkError;
use crate::policy::{ChunkerOptions, WritePolicy};
use crate::util::artifact_path;

/// One written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub index: usize,
    pub path: PathBuf,
    pub len: usize,
}

pub trait ArtifactSink: Send + Sync {
    /// Called once before the first write of a run.
    fn prepare(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn write(&self, index: usize, content: &[u8]) -> Result<ArtifactReport, SinkError>;
}

/// Writes `{dir}/{prefix}_{index}.{ext}` files.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    prefix: String,
    ext: String,
    policy: WritePolicy,
}

impl FileSink {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        ext: impl Into<String>,
        policy: WritePolicy,
    ) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            ext: ext.into(),
            policy,
        }
    }

    pub fn from_options(opts: &ChunkerOptions) -> Self {
        Self::new(
            opts.output_dir.clone(),
            opts.output_prefix.clone(),
            opts.extension.clone(),
            opts.write_policy,
        )
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        artifact_path(&self.dir, &self.prefix, index, &self.ext)
    }

    /// Creates the output directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir).map_err(|e| SinkError::io_err(&self.dir, e))
    }

    fn write_atomic(&self, path: &Path, content: &[u8]) -> Result<(), SinkError> {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| SinkError::io_err(&self.dir, e))?;
        tmp.write_all(content)
            .and_then(|()| tmp.as_file().sync_data())
            .map_err(|e| SinkError::io_err(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| SinkError::io_err(path, e.error))?;
        Ok(())
    }

    fn write_direct(&self, path: &Path, content: &[u8]) -> Result<(), SinkError> {
        let mut f = File::create(path).map_err(|e| SinkError::io_err(path, e))?;
        f.write_all(content).map_err(|e| SinkError::io_err(path, e))
    }
}

impl ArtifactSink for FileSink {
    fn prepare(&self) -> Result<(), SinkError> {
        self.ensure_dir()
    }

    fn write(&self, index: usize, content: &[u8]) -> Result<ArtifactReport, SinkError> {
        let path = self.path_for(index);
        match self.policy {
            WritePolicy::Atomic => self.write_atomic(&path, content)?,
            WritePolicy::Direct => self.write_direct(&path, content)?,
        }
        log::debug!("saved {} ({} bytes)", path.display(), content.len());
        Ok(ArtifactReport {
            index,
            path,
            len: content.len(),
        })
    }
}
