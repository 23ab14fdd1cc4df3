//! Unit tests for the bond desk.
//!
//! - amount conversion and form validation
//! - address checksums, ABI encoding and call construction
//! - the per-operation lifecycle, status labels and the bevy plugin
//! - the batch order runner



#[cfg(test)]
pub mod lifecycle;
