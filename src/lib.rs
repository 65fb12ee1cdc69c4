// Library root — exposes internals for integration tests and future crate
// consumers.  The binary entry point is src/main.rs.

pub mod comms;
pub mod config;
pub mod error;
pub mod logger;
pub mod storage;
pub mod survey;
