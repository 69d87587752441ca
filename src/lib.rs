// latbench - Library root

pub mod config;
pub mod error;
pub mod evaluator;
pub mod http_client;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod stats;
pub mod table;
pub mod tui;
