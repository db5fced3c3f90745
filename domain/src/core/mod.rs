//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] — domain-level errors
//! - [`string::truncate`] — bounded display strings for reports and traces

pub mod error;
pub mod string;
