//! Report module - console summaries and exported run artifacts

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
