pub mod orchestrator;
pub mod render;
pub mod worker;
