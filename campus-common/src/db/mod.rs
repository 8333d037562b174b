//! Database schema and bootstrap provisioning

pub mod init;

pub use init::*;
