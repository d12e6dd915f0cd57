pub mod collaborators;
pub mod executor;
pub mod ledger;
pub mod limiter;
pub mod orchestrator;
pub mod policy;
pub mod state;
pub mod summary;
