//! Prometheus metrics collection for bidstage.
//!
//! Exposed on the HTTP endpoint served by [`crate::http`].
//!
//! - `bidstage_command_total{action}` - Commands processed by action
//! - `bidstage_command_duration_seconds{action}` - Command latency histogram
//! - `bidstage_command_errors_total{action,code}` - Failed commands
//! - `bidstage_transfers_total{outcome}` - Transfers by outcome
//! - `bidstage_broadcast_fanout` - Recipients per published event (histogram)

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Commands refused by the per-connection rate limiter.
pub static RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

/// Connections dropped because their outbound queue was full.
pub static SUBSCRIBERS_DROPPED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

/// Currently connected WebSocket clients.
pub static CONNECTED_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

/// Sessions currently open.
pub static OPEN_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Command and domain metrics
// ========================================================================

/// Commands processed by action.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command processing latency by action.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by action and error code.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Transfers by outcome (`committed` or an error code).
pub static TRANSFERS: OnceLock<IntCounterVec> = OnceLock::new();

/// Recipients per published event.
pub static BROADCAST_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
/// Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::error!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(RATE_LIMITED, IntCounter::new("bidstage_rate_limited_total", "Commands refused by the rate limiter"));
    register!(SUBSCRIBERS_DROPPED, IntCounter::new("bidstage_subscribers_dropped_total", "Connections dropped for backpressure"));
    register!(CONNECTED_CLIENTS, IntGauge::new("bidstage_connected_clients", "Currently connected clients"));
    register!(OPEN_SESSIONS, IntGauge::new("bidstage_open_sessions", "Sessions currently open"));

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("bidstage_command_total", "Commands processed by action"), &["action"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("bidstage_command_duration_seconds", "Command latency by action")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        &["action"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("bidstage_command_errors_total", "Command errors by action and code"), &["action", "code"]));
    register!(TRANSFERS, IntCounterVec::new(Opts::new("bidstage_transfers_total", "Transfers by outcome"), &["outcome"]));
    register!(BROADCAST_FANOUT, Histogram::with_opts(
        HistogramOpts::new("bidstage_broadcast_fanout", "Recipients per published event")
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Record a command execution with latency.
#[inline]
pub fn record_command(action: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[action]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[action]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(action: &str, code: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[action, code]).inc();
    }
}

/// Record a transfer outcome.
#[inline]
pub fn record_transfer(outcome: &str) {
    if let Some(c) = TRANSFERS.get() {
        c.with_label_values(&[outcome]).inc();
    }
}

/// Record how many connections received a published event.
#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(h) = BROADCAST_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

#[inline]
pub fn inc_dropped_subscribers() {
    if let Some(c) = SUBSCRIBERS_DROPPED.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_rate_limited() {
    if let Some(c) = RATE_LIMITED.get() {
        c.inc();
    }
}

#[inline]
pub fn add_connected_clients(delta: i64) {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.add(delta);
    }
}

#[inline]
pub fn add_open_sessions(delta: i64) {
    if let Some(g) = OPEN_SESSIONS.get() {
        g.add(delta);
    }
}
