pub mod engine;
pub mod placer;
