pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod report;
pub mod service;
pub mod units;
