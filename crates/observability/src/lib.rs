//! Process-wide logging setup.

pub mod tracing;

/// Log output shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Structured JSON lines, for log shippers.
    #[default]
    Json,
    /// Human-readable, for terminals during development.
    Pretty,
}

/// Initialize tracing for the process with the default (JSON) format.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::Json);
}
