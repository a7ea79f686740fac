pub mod client;
pub mod config;
pub mod console;
pub mod errors;
pub mod fields;
pub mod form;
pub mod telemetry;
