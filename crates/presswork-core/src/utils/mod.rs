//! Utility functions and helpers for the presswork core.

pub mod formatting;

pub use formatting::truncate_id;
