pub mod feed;
pub mod orchestrator;
pub mod quantity;
