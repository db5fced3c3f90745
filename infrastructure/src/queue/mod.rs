//! Queue backing-store adapters.

mod memory;

pub use memory::InMemoryQueueStore;
