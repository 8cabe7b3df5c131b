pub mod analysis;
pub mod classpath;
pub mod cli;
pub mod command;
pub mod config;
pub mod core;
pub mod engine;
pub mod errors;
pub mod platform;
pub mod plugins;
pub mod report;
pub mod resolve;
pub mod sources;
pub mod ui;
