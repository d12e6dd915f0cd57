pub mod inputs;
pub mod stages;
