//! Logging utilities.
//!
//! Logger initialization lives here together with the debug toggle that
//! gates per-node render tracing. Everything else logs through the `log`
//! facade directly.

mod init;

pub use init::{LoggingConfig, debug_enabled, init_logging, set_debug};
pub(crate) use init::trace_render;
