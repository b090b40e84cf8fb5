//! # Wiring Sample
//!
//! A tiny markdown wiki assembled by the `wiring` container: a page store, a thumbnail
//! cache on top of it, and a ticker that keeps the cache warm. This library exposes the
//! pieces for the binary and for integration testing.

pub mod lifecycle;
pub mod model;
pub mod pages;
pub mod thumbs;
pub mod ticker;
