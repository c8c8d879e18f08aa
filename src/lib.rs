pub mod config;
pub mod dispatch;
pub mod humanize;
pub mod observability;
pub mod orchestrator;
pub mod queue;
pub mod strategies;
pub mod worker;
