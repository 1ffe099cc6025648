/// Conversion of geospatial meshes, elevation models and imagery into UV3
/// point and triangle streams.
pub mod bounds;
pub mod constants;
pub mod converter;
pub mod coordinates;
pub mod error;
pub mod geotransform;
pub mod heightmap;
pub mod inspect;
pub mod manifest;
pub mod mesh;
pub mod palette;
pub mod raster;
pub mod raster_io;
pub mod reproject;
pub mod sampler;
pub mod uv3;

pub use converter::{ConversionPipeline, DemColourOptions, ImageryOptions, MeshOptions, RunStats};
pub use error::{ConvertError, Result};
