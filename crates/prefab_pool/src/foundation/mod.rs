//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the pool:
//! - Math types for placement and transforms
//! - Handle types for objects, templates and pools
//! - Clocks for delay scheduling
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod time;
pub mod logging;
