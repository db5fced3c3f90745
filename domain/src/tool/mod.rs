//! Tool subdomain: capability descriptors, calls, results, providers.

pub mod entities;
pub mod provider;
pub mod value_objects;

pub use entities::{ToolCall, ToolCatalog, ToolDescriptor};
pub use provider::{ProviderError, ToolProvider};
pub use value_objects::{ToolError, ToolResult};
