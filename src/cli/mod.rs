//! CLI command implementations.

pub mod init;
pub mod log;
pub mod serve;
