//! doctier: Document Completeness Tiering Library
//!
//! Scores employee document completeness, clusters records into Low, Medium
//! and High tiers with a tied-covariance Gaussian mixture or K-Means, checks
//! the tiers against a rule-based reference and ranks organizational groups.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
