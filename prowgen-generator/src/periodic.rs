//! Periodic jobs: one per recognized entry under `periodics`, plus the
//! coverage and cluster maintenance jobs added after the walk.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use prowgen_core::metadata::{build_proj_repo_str, job_suffix, COVERAGE_JOB_SUFFIX};
use prowgen_core::{
    apply_overrides, ConfigMap, JobDescription, JobSuffix, Location, PeriodicKind, RepoKey,
    Repository, SectionVisitor,
};
use prowgen_renderer::{JobContext, PeriodicContext};

use crate::context::{JobTemplate, RunContext, PERIODICS_SECTION};
use crate::error::GenerateError;
use crate::presubmit::{finish_job, setup_coverage_job, PRESUBMIT_SCRIPT};

pub const RUNNER: &str = "runner.sh";
pub const RELEASE_SCRIPT: &str = "./hack/release.sh";
pub const PERFORMANCE_SCRIPT: &str = "./test/performance-tests.sh";

/// Minute past the hour for `job_name`, stable across runs.
pub fn cron_minute(job_name: &str) -> u64 {
    let digest = Sha256::digest(job_name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head) % 60
}

fn default_cron(suffix: &JobSuffix, minute: u64) -> String {
    let hours = match suffix {
        JobSuffix::Kind(PeriodicKind::Continuous) | JobSuffix::Custom(_) => "*/3 * * *",
        JobSuffix::Kind(PeriodicKind::BranchCi) => "8 * * *",
        JobSuffix::Kind(PeriodicKind::Nightly) => "9 * * *",
        JobSuffix::Kind(PeriodicKind::DotRelease) => "9 * * 2",
        JobSuffix::Kind(PeriodicKind::AutoRelease) => "*/4 * * *",
        JobSuffix::Kind(PeriodicKind::Performance) => "*/2 * * *",
        JobSuffix::Kind(PeriodicKind::WebhookApicoverage) => "10 * * *",
    };
    format!("{minute} {hours}")
}

/// Command and arguments a kind runs before overrides apply.
fn kind_command(suffix: &JobSuffix) -> (&'static str, Vec<String>) {
    let args = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    match suffix {
        JobSuffix::Kind(PeriodicKind::Continuous | PeriodicKind::BranchCi) => {
            (RUNNER, args(&[PRESUBMIT_SCRIPT, "--all-tests", "--emit-metrics"]))
        }
        JobSuffix::Kind(PeriodicKind::Nightly) => {
            (RUNNER, args(&[RELEASE_SCRIPT, "--publish", "--tag-release"]))
        }
        JobSuffix::Kind(PeriodicKind::DotRelease) => {
            (RUNNER, args(&[RELEASE_SCRIPT, "--dot-release", "--release-gcs", "knative-releases"]))
        }
        JobSuffix::Kind(PeriodicKind::AutoRelease) => {
            (RUNNER, args(&[RELEASE_SCRIPT, "--auto-release", "--release-gcs", "knative-releases"]))
        }
        JobSuffix::Kind(PeriodicKind::Performance) => (RUNNER, args(&[PERFORMANCE_SCRIPT])),
        JobSuffix::Kind(PeriodicKind::WebhookApicoverage) => {
            (RUNNER, args(&["./test/apicoverage.sh"]))
        }
        JobSuffix::Custom(_) => (RUNNER, Vec::new()),
    }
}

/// Generator keys; every other key is an override.
fn is_generator_key(key: &str) -> bool {
    matches!(key, "custom-job" | "release" | "cron")
        || PeriodicKind::all()
            .iter()
            .any(|k| *k != PeriodicKind::Performance && k.key() == key)
}

/// Walks `periodics` and emits one job per recognized entry. A
/// coverage-enabled repository gets its coverage periodic right after its
/// own entries.
pub struct PeriodicGenerator<'a> {
    ctx: &'a mut RunContext,
    covered: HashSet<RepoKey>,
}

impl<'a> PeriodicGenerator<'a> {
    pub fn new(ctx: &'a mut RunContext) -> Self {
        Self { ctx, covered: HashSet::new() }
    }
}

impl SectionVisitor for PeriodicGenerator<'_> {
    type Error = GenerateError;

    fn generate(
        &mut self,
        title: &str,
        repo_key: &str,
        entries: &ConfigMap,
        location: &Location,
    ) -> Result<(), GenerateError> {
        let Some(suffix) = job_suffix(entries, location)? else {
            tracing::debug!(%location, "periodic entry has no job kind");
            return Ok(());
        };
        let mut job = JobDescription::new(repo_key, &self.ctx.base, location)?;

        let release = match entries.get("release") {
            Some(value) => Some(value.expect_text(&location.child("release"))?),
            None if suffix == JobSuffix::Kind(PeriodicKind::BranchCi) => {
                entries.require("release", location)?;
                None
            }
            None => None,
        };
        job.repo_branch = match &release {
            Some(version) => format!("release-{version}"),
            None => "main".to_string(),
        };
        let project = match &release {
            Some(version) => build_proj_repo_str(&job.org, version),
            None => job.org.clone(),
        };
        let dashboard = build_proj_repo_str(&project, &job.repo_name);
        let name = format!("ci-{dashboard}-{}", suffix.as_str());

        let (command, args) = kind_command(&suffix);
        job.command = command.to_string();
        job.args = args;
        if suffix == JobSuffix::Kind(PeriodicKind::Performance) {
            job.needs_monitor = true;
        }

        let overrides: ConfigMap = entries
            .iter()
            .filter(|(key, _)| !is_generator_key(key))
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        apply_overrides(&mut job, &overrides, &mut self.ctx.override_env(), location)?;

        let cron = match entries.get("cron") {
            Some(value) => value.expect_text(&location.child("cron"))?,
            None => default_cron(&suffix, cron_minute(&name)),
        };
        self.emit(title, job, name, cron, location)
    }

    fn finalize(
        &mut self,
        title: &str,
        repo_key: &str,
        _accumulated: &[&ConfigMap],
    ) -> Result<(), GenerateError> {
        let Some(repo) = self.ctx.registry.get(&RepoKey::from(repo_key)).cloned() else {
            return Ok(());
        };
        if !repo.enable_go_coverage {
            return Ok(());
        }
        let location = Location::root(title).child(repo_key);
        self.emit_coverage(&repo, &location)
    }
}

impl PeriodicGenerator<'_> {
    fn emit(
        &mut self,
        section: &str,
        mut job: JobDescription,
        name: String,
        cron: String,
        location: &Location,
    ) -> Result<(), GenerateError> {
        finish_job(&mut job, location)?;
        if job.needs_monitor {
            job.add_monitoring_pubsub_labels(&name);
        }
        let data = PeriodicContext {
            job: JobContext::new(name.as_str(), &job, &self.ctx.render),
            cron,
        };
        let repo_key = job.repo_key.clone();
        self.ctx.emit(JobTemplate::Periodic, section, &repo_key, &name, &data)
    }

    /// Coverage periodic for `repo`, at most once per run.
    fn emit_coverage(
        &mut self,
        repo: &Repository,
        location: &Location,
    ) -> Result<(), GenerateError> {
        if !self.covered.insert(repo.key.clone()) {
            return Ok(());
        }
        let mut job = self.base_job(&repo.key.0, location)?;
        setup_coverage_job(&mut job, repo.go_coverage_threshold);
        let name = format!("ci-{}-{COVERAGE_JOB_SUFFIX}", job.repo_name_for_job());
        let cron = format!("{} */6 * * *", cron_minute(&name));
        self.emit(PERIODICS_SECTION, job, name, cron, location)
    }

    /// Coverage periodics for coverage-enabled repositories the walk never
    /// reached, then cluster maintenance periodics for performance-enabled
    /// ones.
    pub fn generate_post_walk(&mut self) -> Result<(), GenerateError> {
        let repos: Vec<_> = self.ctx.registry.iter().cloned().collect();
        for repo in repos.iter().filter(|r| r.enable_go_coverage) {
            let location = Location::root(PERIODICS_SECTION).child(repo.key.to_string());
            self.emit_coverage(repo, &location)?;
        }
        for repo in repos.iter().filter(|r| r.enable_performance_tests) {
            let location = Location::root(PERIODICS_SECTION).child(repo.key.to_string());
            let actions = [("recreate-clusters", "1 * * 6"), ("update-clusters", "*/5 * * *")];
            for (action, hours) in actions {
                let mut job = self.base_job(&repo.key.0, &location)?;
                job.command = RUNNER.to_string();
                job.args = vec![PERFORMANCE_SCRIPT.to_string(), format!("--{action}")];
                let name = format!("ci-{}-{action}", job.repo_name_for_job());
                let cron = format!("{} {hours}", cron_minute(&name));
                self.emit(PERIODICS_SECTION, job, name, cron, &location)?;
            }
        }
        Ok(())
    }

    fn base_job(
        &mut self,
        repo_key: &str,
        location: &Location,
    ) -> Result<JobDescription, GenerateError> {
        let mut job = JobDescription::new(repo_key, &self.ctx.base, location)?;
        job.repo_branch = "main".to_string();
        apply_overrides(&mut job, &ConfigMap::new(), &mut self.ctx.override_env(), location)?;
        Ok(job)
    }
}
