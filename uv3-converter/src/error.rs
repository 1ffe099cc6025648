/// Error types for reading inputs and writing UV3 streams.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("OpenEXR error: {0}")]
    Exr(#[from] exr::error::Error),

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    #[error("invalid geotransform: {0}")]
    InvalidGeoTransform(String),

    #[error("no world file found next to {}", .0.display())]
    MissingWorldFile(PathBuf),

    #[error("band {band} requested but raster has {available} band(s)")]
    BandOutOfRange { band: usize, available: usize },

    #[error("unknown palette '{0}'")]
    UnknownPalette(String),

    #[error("unknown coordinate system '{0}'")]
    UnknownCrs(String),

    #[error("stream ends with a partial record of {0} byte(s)")]
    TruncatedRecord(usize),

    #[error("unknown primitive tag {0}")]
    UnknownPrimitive(u8),

    #[error("unsupported input format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    pub(crate) fn parse(path: &std::path::Path, line: usize, message: impl Into<String>) -> Self {
        ConvertError::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}
