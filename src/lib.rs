pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod indicators;
pub mod loader;
pub mod processor;
pub mod storage;
pub mod utils;
