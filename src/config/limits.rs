//! Mailbox, queue and rate limits configuration.

use serde::Deserialize;

/// Runtime limits.
///
/// These bound per-session and per-connection buffers so one slow client or
/// one busy session cannot exhaust memory.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Session actor mailbox capacity (default: 256).
    #[serde(default = "default_session_mailbox_capacity")]
    pub session_mailbox_capacity: usize,
    /// Outbound frames buffered per connection before it is dropped (default: 256).
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Sustained commands per second per connection (default: 20).
    #[serde(default = "default_commands_per_second")]
    pub commands_per_second: u32,
    /// Maximum ledger entries returned by one `ledger` request (default: 100).
    #[serde(default = "default_ledger_page_size")]
    pub ledger_page_size: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            session_mailbox_capacity: default_session_mailbox_capacity(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            commands_per_second: default_commands_per_second(),
            ledger_page_size: default_ledger_page_size(),
        }
    }
}

fn default_session_mailbox_capacity() -> usize {
    256
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_commands_per_second() -> u32 {
    20
}

fn default_ledger_page_size() -> u32 {
    100
}
