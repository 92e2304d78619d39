//! Property tests for templater.
//!
//! Randomized inputs guard the invariants that must hold for any template,
//! data value or path: the security gate never lets an injection sequence
//! or traversal through, and the template language never panics.
//!
//! Run with: `cargo test --test properties`

#[path = "properties/security.rs"]
mod security;

#[path = "properties/template.rs"]
mod template;

#[path = "properties/file_cache.rs"]
mod file_cache;
