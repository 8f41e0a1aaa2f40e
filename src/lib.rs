pub mod config;
pub mod db;
pub mod effectiveness;
pub mod engine;
pub mod error;
pub mod factors;
pub mod interventions;
pub mod logging;
pub mod models;
pub mod policy;
pub mod predictions;
pub mod report;
pub mod risk;
pub mod signals;
pub mod trend;
