//! Logger setup.
//!
//! Library code only talks to the `log` facade. The binary picks the backend
//! by calling [`init_logging`] once at startup.

mod init;

pub use init::{LoggingConfig, init_logging};
