//! Workflow subdomain: deduplicated side-effect requests.

pub mod request;

pub use request::{RequestKind, RequestStatus, WorkflowRequest, derive_request_id};
