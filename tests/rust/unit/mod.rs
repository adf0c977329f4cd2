//! Unit tests - catalog and query file loading
//!
//! These tests exercise the public loading surface without translating
//! anything end to end.

mod catalog_loading_tests;
mod query_file_tests;
