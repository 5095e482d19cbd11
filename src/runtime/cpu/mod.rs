//! CPU engine implementation
//!
//! The CPU engine runs every combinator in-process over ordered sparse
//! storage. It is the reference engine used by [`Context::new`](crate::Context::new)
//! and by the test suite.
//!
//! # Descriptor extensions
//!
//! The engine accepts the extension descriptor options `nthreads`, `chunk`,
//! `axb_method`, and `sort`. They are validated and recorded with the
//! descriptor handle; execution is single-threaded regardless.

mod compute;
mod engine;

pub use engine::CpuEngine;
