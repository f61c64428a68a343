//! Telemetry utilities for command timing and tracing spans.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    action: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.action, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Create a span for a client connection.
    pub fn connection(conn: &str, addr: &str) -> Span {
        info_span!("connection", conn = %conn, addr = %addr)
    }

    /// Create a span for a command execution.
    pub fn command(action: &str, conn: &str, host: Option<&str>) -> Span {
        if let Some(host) = host {
            debug_span!("command", action = %action, conn = %conn, host = %host)
        } else {
            debug_span!("command", action = %action, conn = %conn)
        }
    }
}
