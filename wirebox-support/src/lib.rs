//! # Wirebox Support
//!
//! Shared utilities for the Wirebox container crates.
//!
//! This crate provides:
//! - Chain rendering for resolution errors
//! - "Did you mean?" suggestions for unknown class names

pub mod rendering;
