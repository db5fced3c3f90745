//! Review memory adapters.

mod file_memory;

pub use file_memory::FileMemory;
