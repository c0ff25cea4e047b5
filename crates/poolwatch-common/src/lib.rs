//! Shared domain types for the poolwatch crates.
//!
//! A [`types::LogRecord`] is what the line parser extracts from one access-log
//! line; an [`types::AlertEvent`] is what the alert engine hands to the
//! notification layer.

pub mod types;
