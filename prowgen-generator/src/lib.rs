//! # prowgen-generator
//!
//! Job generation over a configuration document, plus the atomic writer
//! and diff used to publish the results.
//!
//! Call [`generate`] to render jobs, the dashboard configuration and the
//! tide configuration in memory, then [`write_outputs`] or [`diff_output`]
//! for the artifacts.

pub mod context;
pub mod diff;
pub mod error;
pub mod periodic;
pub mod pipeline;
pub mod presubmit;
pub mod prow;
pub mod testgrid;
pub mod writer;

pub use context::{RunContext, RunOptions};
pub use diff::{diff_output, FileDiff};
pub use error::GenerateError;
pub use pipeline::{generate, GeneratedOutput};
pub use prow::ProwConfigData;
pub use testgrid::TestgridConfig;
pub use writer::{write_output, write_outputs, WriteResult};
