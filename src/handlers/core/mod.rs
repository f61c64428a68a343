//! Core handler infrastructure: context, trait and registry.

mod context;
mod registry;

pub use context::{ConnectionState, Context, Handler, HandlerResult, mismatched, to_value};
pub use registry::Registry;
