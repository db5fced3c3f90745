//! Lifecycle event sinks.

mod jsonl;

pub use jsonl::JsonlEventSink;
