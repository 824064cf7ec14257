//! Utility functions for common operations.
//!
//! - **Domain comparison**: registrable-domain extraction for same-site checks
//! - **Text processing**: width-aware URL truncation for the progress display

mod domain;
mod text;

pub use domain::{registrable_domain, same_registrable_domain};
pub use text::truncate_url;
