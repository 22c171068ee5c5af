//! Template-based generators used whenever a provider is unavailable or its
//! output cannot be used.

pub mod grading;
pub mod journal;
pub mod reports;
pub mod scheme;
