pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod report;

pub use error::{ScoreError, ScoreResult};
