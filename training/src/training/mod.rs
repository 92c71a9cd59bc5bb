//! Training pipelines.
//!
//! - [`classical`]: lexical features + random forest.
//! - [`trainer`]: character CNN over encoded URL sequences.
//!
//! Both use the stratified split from [`data`] and report through
//! [`metrics`].

pub mod classical;
pub mod data;
pub mod metrics;
pub mod trainer;
