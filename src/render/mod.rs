pub mod fonts;
pub mod raster;
pub mod text;
