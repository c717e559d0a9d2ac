//! # Sunduq Support
//!
//! Shared utilities for the Sunduq IoC container.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - Naming rules shared by the scanner and the definition builder

pub mod naming;
pub mod rendering;
