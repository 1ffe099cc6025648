/// JSON run manifest written next to a UV3 output.
use crate::bounds::OutputBounds;
use crate::constants::MANIFEST_SUFFIX;
use crate::converter::RunStats;
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Description of one conversion run, for downstream indexing tools.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    /// Pipeline variant name (`mesh`, `rgb-dem`, `poly`, `dem-colour`).
    pub pipeline: String,
    /// Input files in the order they were given.
    pub inputs: Vec<PathBuf>,
    /// UV3 file the records were written to.
    pub output: PathBuf,
    pub record_count: u64,
    pub byte_size: u64,
    pub points: u64,
    pub triangle_vertices: u64,
    /// Positions as encoded: radians and metres. `None` for an empty stream.
    pub bounds: Option<OutputBounds>,
    pub elapsed_seconds: f64,
}

impl RunManifest {
    pub fn new(
        pipeline: &str,
        inputs: Vec<PathBuf>,
        output: &Path,
        stats: &RunStats,
        elapsed_seconds: f64,
    ) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            inputs,
            output: output.to_path_buf(),
            record_count: stats.records,
            byte_size: stats.bytes,
            points: stats.points,
            triangle_vertices: stats.triangle_vertices,
            bounds: (!stats.bounds.is_empty()).then_some(stats.bounds),
            elapsed_seconds,
        }
    }

    /// Manifest location for an output file: `<output>.json`.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_owned();
        name.push(MANIFEST_SUFFIX);
        PathBuf::from(name)
    }

    /// Write the manifest beside `self.output` and return its path.
    pub fn write(&self) -> Result<PathBuf> {
        let path = Self::path_for(&self.output);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        fs::write(&path, json)?;
        info!("Generated run manifest: {}", path.display());
        Ok(path)
    }
}
