//! Integration tests for pancake-query.
//!
//! Every test runs the public pipeline against an in-memory transport; no
//! network access is needed.

mod helpers;
mod pipeline;
