//! # prowgen-renderer
//!
//! Tera-based rendering of job descriptions into CI job definitions, with
//! job-name filtering and section header deduplication.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use prowgen_renderer::{JobTarget, TemplateEngine, TemplateExecutor, PERIODIC_TEMPLATE};
//!
//! fn emit(data: &serde_json::Value) -> Result<String, prowgen_renderer::RenderError> {
//!     let engine = TemplateEngine::new(None)?;
//!     let template = engine.read_template(PERIODIC_TEMPLATE)?.to_string();
//!     let mut executor = TemplateExecutor::new(engine, "");
//!     let target = JobTarget {
//!         section_title: "periodics",
//!         repo_name: "knative/serving",
//!         job_name: "ci-knative-serving-continuous",
//!         group_by_repo: false,
//!     };
//!     executor.execute_job_template(PERIODIC_TEMPLATE, &template, &target, data)?;
//!     Ok(executor.into_sink().into_string())
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod lines;
pub mod sink;

pub use context::{JobContext, PeriodicContext, PresubmitContext, RenderOptions};
pub use engine::{TemplateEngine, PERIODIC_TEMPLATE, PRESUBMIT_TEMPLATE, PROW_CONFIG_TEMPLATE};
pub use error::RenderError;
pub use executor::{JobTarget, SectionState, TemplateExecutor};
pub use sink::Sink;
