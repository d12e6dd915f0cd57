pub mod cutout;
pub mod decode;
pub mod fetch;
pub mod svg;
