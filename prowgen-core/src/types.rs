//! Domain types for generated CI jobs.
//!
//! Values are kept as typed records; their exact text form is produced by the
//! renderer when a job is emitted.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A repository key of the form `<org>/<repo>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoKey(pub String);

impl RepoKey {
    /// Split into `(org, repo)`; `None` unless the key has exactly one `/`
    /// with non-empty halves.
    pub fn split(&self) -> Option<(&str, &str)> {
        let (org, repo) = self.0.split_once('/')?;
        if org.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some((org, repo))
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Job description records
// ---------------------------------------------------------------------------

/// One container environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// A pod volume together with its container mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub mount_path: String,
    /// Secret volumes mount read-only from a secret of the same name.
    pub secret: bool,
    /// Source lines below the volume name (`emptyDir: {}`, `hostPath:` ...).
    pub source: Vec<String>,
}

/// A job label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub key: String,
    pub value: String,
}

/// One `requests` or `limits` block, quantities in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    pub kind: String,
    pub quantities: Vec<(String, String)>,
}

/// Slack reporting settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlackReporter {
    pub channel: Option<String>,
    pub report_template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReporterConfig {
    pub slack: Option<SlackReporter>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityContext {
    pub privileged: bool,
}

/// An extra repository checked out by a periodic job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraRef {
    pub org: String,
    pub repo: String,
    pub base_ref: Option<String>,
    pub path_alias: Option<String>,
}

/// The resolved, renderable description of one generated job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDescription {
    // identity
    pub repo_key: String,
    pub org: String,
    pub repo_name: String,
    pub repo_uri: String,
    pub repo_branch: String,
    pub path_alias: Option<String>,

    // execution
    pub image: String,
    pub command: String,
    pub args: Vec<String>,
    pub timeout: u64,
    pub resources: Vec<ResourceBlock>,
    pub env: Vec<EnvVar>,
    pub volumes: Vec<Volume>,
    pub security_context: Option<SecurityContext>,
    pub service_account: String,

    // filters
    pub branches: Vec<String>,
    pub skip_branches: Vec<String>,
    pub always_run: bool,
    pub optional: bool,
    pub needs_monitor: bool,

    pub labels: Vec<Label>,

    // reporting
    pub reporter_config: Option<ReporterConfig>,
    pub job_states_to_report: Vec<String>,

    pub extra_refs: Vec<ExtraRef>,
}

// ---------------------------------------------------------------------------
// Repository registry
// ---------------------------------------------------------------------------

/// A known repository and the features its jobs switched on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub key: RepoKey,
    pub enable_go_coverage: bool,
    pub go_coverage_threshold: u64,
    pub enable_performance_tests: bool,
}

impl Repository {
    pub const DEFAULT_COVERAGE_THRESHOLD: u64 = 50;

    pub fn new(key: RepoKey) -> Self {
        Self {
            key,
            enable_go_coverage: false,
            go_coverage_threshold: Self::DEFAULT_COVERAGE_THRESHOLD,
            enable_performance_tests: false,
        }
    }
}

/// All repositories seen during one run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryRegistry {
    repos: IndexMap<RepoKey, Repository>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `key`, created with defaults on first use.
    pub fn entry(&mut self, key: &RepoKey) -> &mut Repository {
        self.repos
            .entry(key.clone())
            .or_insert_with(|| Repository::new(key.clone()))
    }

    pub fn get(&self, key: &RepoKey) -> Option<&Repository> {
        self.repos.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repos.values()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}
