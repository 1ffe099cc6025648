pub mod coordinate_system;
pub mod raster;
pub mod uv3;
