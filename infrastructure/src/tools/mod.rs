//! Tool adapters: the capability registry and the built-in provider.

pub mod builtin;
mod registry;

pub use builtin::BuiltinProvider;
pub use registry::ToolRegistry;
