//! Infrastructure layer for panel-review
//!
//! This crate contains adapters that implement the ports defined in
//! the application layer, plus configuration file loading.

pub mod cache;
pub mod ci;
pub mod config;
pub mod events;
pub mod memory;
pub mod queue;
pub mod reasoning;
pub mod tools;

// Re-export commonly used types
pub use cache::InMemoryTtlCache;
pub use ci::MockCiRunner;
pub use config::{ConfigLoader, FileConfig};
pub use events::JsonlEventSink;
pub use memory::FileMemory;
pub use queue::InMemoryQueueStore;
pub use reasoning::HeuristicReasoner;
pub use tools::{BuiltinProvider, ToolRegistry};
