// src/agents/mod.rs

pub mod agent_trait;
pub mod agent_type;
pub mod config;
pub mod instance_trader;
pub mod report;
pub mod test_trader;
pub mod zip_trader;
