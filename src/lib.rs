// Library root — the binary in src/main.rs and the integration tests both
// build on these modules.

pub mod config;
pub mod error;
pub mod logger;
pub mod subsystems;
pub mod supervisor;
