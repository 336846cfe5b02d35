//! URL and domain validation for Mannerly
//!
//! This module provides the predicates used to reject bad input before any
//! network activity happens, and the helpers that derive stable names from a
//! netloc.

mod domain;
mod uri;

pub use domain::{cache_partition_name, is_valid_domain};
pub use uri::{is_valid_absolute_url, parse_absolute_url, request_path};
