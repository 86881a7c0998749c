//! Structured logging.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and one fmt
//! layer (pretty, compact or JSON).

mod tracing_init;

pub use tracing_init::*;
