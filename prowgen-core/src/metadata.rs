//! Dashboard metadata index: project → repository → job suffixes.
//!
//! Release entries register under a composite project name (base project plus
//! release version). Repositories that opted into coverage get exactly one
//! `test-coverage` suffix: during the walk if they have periodic entries,
//! otherwise from [`add_remaining_test_coverage_jobs`] afterwards.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::error::{ConfigError, Location};
use crate::node::ConfigMap;
use crate::types::RepoKey;

/// Suffix of the synthesized coverage job.
pub const COVERAGE_JOB_SUFFIX: &str = "test-coverage";

/// Repository → ordered job suffixes.
pub type JobDetailMap = IndexMap<String, Vec<String>>;

// ---------------------------------------------------------------------------
// Periodic kinds
// ---------------------------------------------------------------------------

/// Boolean periodic flags, in the priority order used to pick a job's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodicKind {
    DotRelease,
    AutoRelease,
    Nightly,
    Performance,
    WebhookApicoverage,
    Continuous,
    BranchCi,
}

impl PeriodicKind {
    /// All kinds, highest priority first.
    pub fn all() -> &'static [PeriodicKind] {
        &[
            PeriodicKind::DotRelease,
            PeriodicKind::AutoRelease,
            PeriodicKind::Nightly,
            PeriodicKind::Performance,
            PeriodicKind::WebhookApicoverage,
            PeriodicKind::Continuous,
            PeriodicKind::BranchCi,
        ]
    }

    /// Configuration key that enables this kind.
    pub fn key(&self) -> &'static str {
        match self {
            PeriodicKind::DotRelease         => "dot-release",
            PeriodicKind::AutoRelease        => "auto-release",
            PeriodicKind::Nightly            => "nightly",
            PeriodicKind::Performance        => "performance",
            PeriodicKind::WebhookApicoverage => "webhook-apicoverage",
            PeriodicKind::Continuous         => "continuous",
            PeriodicKind::BranchCi           => "branch-ci",
        }
    }

    /// Job-name suffix; branch CI reports as a continuous job.
    pub fn suffix(&self) -> &'static str {
        match self {
            PeriodicKind::BranchCi => "continuous",
            other => other.key(),
        }
    }
}

/// What an entry's job is called in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSuffix {
    Custom(String),
    Kind(PeriodicKind),
}

impl JobSuffix {
    pub fn as_str(&self) -> &str {
        match self {
            JobSuffix::Custom(name) => name,
            JobSuffix::Kind(kind) => kind.suffix(),
        }
    }
}

/// Suffix for one periodic entry: `custom-job` wins outright, otherwise the
/// highest-priority enabled flag. `None` when nothing is enabled.
pub fn job_suffix(
    entry: &ConfigMap,
    location: &Location,
) -> Result<Option<JobSuffix>, ConfigError> {
    if let Some(custom) = entry.get("custom-job") {
        return Ok(Some(JobSuffix::Custom(custom.expect_text(&location.child("custom-job"))?)));
    }
    for kind in PeriodicKind::all() {
        if let Some(value) = entry.get(kind.key()) {
            if value.expect_flag(&location.child(kind.key()))? {
                return Ok(Some(JobSuffix::Kind(*kind)));
            }
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Release naming
// ---------------------------------------------------------------------------

fn release_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".-(\d+(?:\.\d+)*)$").expect("release pattern is valid"))
}

/// True when `name` ends in `-<digits>(.<digits>)*` after a non-empty base.
pub fn is_released(name: &str) -> bool {
    release_suffix_pattern().is_match(name)
}

/// Dashboard name for `repo` under `project`. A released project keeps its
/// version last: `knative-0.15` + `serving` → `knative-serving-0.15`.
pub fn build_proj_repo_str(project: &str, repo: &str) -> String {
    match release_suffix_pattern().captures(project).and_then(|caps| caps.get(1)) {
        Some(version) => {
            // The match starts one character before the dash.
            let base = &project[..version.start() - 1];
            format!("{base}-{repo}-{}", version.as_str())
        }
        None => format!("{project}-{repo}"),
    }
}

// ---------------------------------------------------------------------------
// MetadataIndex
// ---------------------------------------------------------------------------

/// Project → repository → job suffixes, all in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataIndex {
    projects: IndexMap<String, JobDetailMap>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `project` (once) and `repo` under it (once).
    pub fn add_project_and_repo(&mut self, project: &str, repo: &str) -> &mut JobDetailMap {
        let jobs = self.projects.entry(project.to_string()).or_default();
        jobs.entry(repo.to_string()).or_default();
        jobs
    }

    pub fn project(&self, project: &str) -> Option<&JobDetailMap> {
        self.projects.get(project)
    }

    pub fn jobs(&self, project: &str, repo: &str) -> Option<&[String]> {
        self.projects.get(project)?.get(repo).map(Vec::as_slice)
    }

    /// Distinct project names in registration order.
    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobDetailMap)> {
        self.projects.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// CoverageMap
// ---------------------------------------------------------------------------

/// `(org, repo)` → pending coverage job.
///
/// Keyed by the full repository key so same-named repositories of different
/// orgs never share a coverage job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageMap {
    repos: IndexMap<(String, String), bool>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the `presubmits` section: every `<org>/<repo>` with an entry
    /// carrying `go-coverage: true` is pending.
    pub fn from_presubmits(presubmits: &ConfigMap) -> Result<Self, ConfigError> {
        let section = Location::root("presubmits");
        let mut map = CoverageMap::new();
        for (key, elements) in presubmits.iter() {
            let at = section.child(key);
            let (project, repo) = split_repo_key(key, &at)?;
            if elements.is_absent() {
                continue;
            }
            for (i, element) in elements.expect_sequence(&at)?.iter().enumerate() {
                let element_loc = at.index(i);
                if let Some(flag) = element.expect_map(&element_loc)?.get("go-coverage") {
                    if flag.expect_bool(&element_loc.child("go-coverage"))? {
                        map.set_pending(project, repo, true);
                    }
                }
            }
        }
        Ok(map)
    }

    pub fn set_pending(&mut self, project: &str, repo: &str, pending: bool) {
        self.repos.insert((project.to_string(), repo.to_string()), pending);
    }

    pub fn is_pending(&self, project: &str, repo: &str) -> bool {
        self.repos
            .get(&(project.to_string(), repo.to_string()))
            .copied()
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    fn clear(&mut self, project: &str, repo: &str) {
        self.repos.shift_remove(&(project.to_string(), repo.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

fn split_repo_key<'k>(
    key: &'k str,
    location: &Location,
) -> Result<(&'k str, &'k str), ConfigError> {
    let repo_key = RepoKey::from(key);
    if repo_key.split().is_none() {
        return Err(ConfigError::InvalidRepoKey {
            location: location.clone(),
            key: key.to_string(),
        });
    }
    // `split` validated the shape.
    Ok(key.split_once('/').unwrap_or((key, "")))
}

/// Build index entries from the `periodics` section value.
pub fn collect_metadata(
    periodics: &ConfigMap,
    index: &mut MetadataIndex,
    coverage: &mut CoverageMap,
) -> Result<(), ConfigError> {
    let section = Location::root("periodics");
    for (key, elements) in periodics.iter() {
        let at = section.child(key);
        let (project, repo) = split_repo_key(key, &at)?;
        index.add_project_and_repo(project, repo);

        if !elements.is_absent() {
            for (i, element) in elements.expect_sequence(&at)?.iter().enumerate() {
                let element_loc = at.index(i);
                let entry = element.expect_map(&element_loc)?;
                let Some(suffix) = job_suffix(entry, &element_loc)? else {
                    continue;
                };
                let project_name = match entry.get("release") {
                    Some(release) => {
                        let version = release.expect_text(&element_loc.child("release"))?;
                        build_proj_repo_str(project, &version)
                    }
                    None => project.to_string(),
                };
                index
                    .add_project_and_repo(&project_name, repo)
                    .entry(repo.to_string())
                    .or_default()
                    .push(suffix.as_str().to_string());
            }
        }

        let jobs = index.add_project_and_repo(project, repo);
        update_test_coverage_job_data_if_needed(jobs, project, repo, coverage);
    }
    Ok(())
}

/// Append the coverage suffix for `<project>/<repo>` if it is still pending,
/// then clear it.
pub fn update_test_coverage_job_data_if_needed(
    jobs: &mut JobDetailMap,
    project: &str,
    repo: &str,
    coverage: &mut CoverageMap,
) {
    if coverage.is_pending(project, repo) {
        jobs.entry(repo.to_string())
            .or_default()
            .push(COVERAGE_JOB_SUFFIX.to_string());
        coverage.clear(project, repo);
    }
}

/// Give every repository still pending coverage its suffix.
pub fn add_remaining_test_coverage_jobs(index: &mut MetadataIndex, coverage: &mut CoverageMap) {
    let pending: Vec<(String, String)> = coverage
        .repos
        .iter()
        .filter(|(_, pending)| **pending)
        .map(|(key, _)| key.clone())
        .collect();
    for (project, repo) in pending {
        let jobs = index.add_project_and_repo(&project, &repo);
        update_test_coverage_job_data_if_needed(jobs, &project, &repo, coverage);
    }
}
