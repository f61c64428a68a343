//! Session actor event handlers.

mod join;
mod publish;
mod queue;
