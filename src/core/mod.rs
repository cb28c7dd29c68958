//! Process-level plumbing: HTTP operations surface and cron scheduling

pub mod http;
pub mod scheduler;

pub use http::*;
pub use scheduler::*;
