//! prowgen core library: configuration tree, job descriptions and resolution.
//!
//! - [`node`]: order-preserving configuration tree
//! - [`types`] / [`job`]: job description records and their base construction
//! - [`overrides`]: per-job override rules
//! - [`section`]: ordered section traversal
//! - [`metadata`]: dashboard metadata index
//! - [`document`]: loading the YAML document
//! - [`error`]: [`ConfigError`], [`DocumentError`]

pub mod document;
pub mod error;
pub mod job;
pub mod metadata;
pub mod node;
pub mod overrides;
pub mod section;
pub mod types;

pub use document::{load_document, parse_document};
pub use error::{ConfigError, DefectKind, DocumentError, Location};
pub use job::BaseJobOptions;
pub use metadata::{CoverageMap, JobDetailMap, JobSuffix, MetadataIndex, PeriodicKind};
pub use node::{ConfigMap, ConfigNode, Scalar};
pub use overrides::{apply_overrides, OverrideEnv};
pub use section::{parse_section, SectionVisitor};
pub use types::{
    EnvVar, ExtraRef, JobDescription, Label, RepoKey, Repository, RepositoryRegistry,
    ReporterConfig, ResourceBlock, SecurityContext, SlackReporter, Volume,
};
