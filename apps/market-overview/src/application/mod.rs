//! Application Layer
//!
//! Ports describe what the dashboard needs from the outside world (the
//! overview backend and a place to keep the language preference). Services
//! hold the use cases: loading the aggregate, rendering it, and running a
//! reasoning stream.

pub mod ports;
pub mod services;
