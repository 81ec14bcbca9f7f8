//! Shared setup for camremote: logging and tracing initialization.

pub mod tracing;

pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
