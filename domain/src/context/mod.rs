//! Context gathering domain types.
//!
//! A specialist asks for context in units of [`ContextRequest`]; each
//! resolved request becomes an append-only [`ContextRecord`] in its
//! scratch state and, later, in its verdict.

pub mod record;
pub mod request;

pub use record::{ContextPayload, ContextRecord, ResolutionSource};
pub use request::{ContextRequest, ContextType};
