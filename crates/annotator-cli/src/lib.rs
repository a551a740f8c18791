//! CLI library components for the metadata annotator.

pub mod commands;
pub mod document;
pub mod logging;
