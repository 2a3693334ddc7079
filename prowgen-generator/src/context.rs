//! Run parameters and the per-run mutable state.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use prowgen_core::{BaseJobOptions, CoverageMap, MetadataIndex, OverrideEnv, RepositoryRegistry};
use prowgen_renderer::{
    JobTarget, RenderOptions, TemplateEngine, TemplateExecutor, PERIODIC_TEMPLATE,
    PRESUBMIT_TEMPLATE,
};

use crate::error::GenerateError;

pub const DEFAULT_IMAGE: &str = "gcr.io/knative-tests/test-infra/prow-tests:stable";
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 50;
pub const DEFAULT_SERVICE_ACCOUNT: &str = "/etc/test-account/service-account.json";
pub const DEFAULT_GCS_BUCKET: &str = "knative-prow";

pub const PRESUBMITS_SECTION: &str = "presubmits";
pub const PERIODICS_SECTION: &str = "periodics";

/// Global parameters of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Emit only the job with exactly this name; empty emits all.
    pub job_filter: String,
    /// Replaces every job's timeout, in minutes.
    pub timeout_override: Option<u64>,
    /// Replaces every job's repository reference.
    pub repository_override: String,
    /// Prepended to every job command.
    pub pre_command: String,
    pub path_alias_orgs: BTreeSet<String>,
    pub non_path_alias_repos: BTreeSet<String>,
    pub image: String,
    pub service_account: String,
    pub gcs_bucket: String,
    /// Directory of `.tera` files overriding the embedded templates.
    pub template_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            job_filter: String::new(),
            timeout_override: None,
            repository_override: String::new(),
            pre_command: String::new(),
            path_alias_orgs: BTreeSet::new(),
            non_path_alias_repos: BTreeSet::new(),
            image: DEFAULT_IMAGE.to_string(),
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
            gcs_bucket: DEFAULT_GCS_BUCKET.to_string(),
            template_dir: None,
        }
    }
}

impl RunOptions {
    pub fn base_job(&self) -> BaseJobOptions {
        BaseJobOptions {
            image: self.image.clone(),
            timeout: DEFAULT_TIMEOUT_MINUTES,
            service_account: self.service_account.clone(),
            path_alias_orgs: self.path_alias_orgs.clone(),
            non_path_alias_repos: self.non_path_alias_repos.clone(),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            pre_command: self.pre_command.clone(),
            repository_override: self.repository_override.clone(),
        }
    }
}

/// Which job template a job is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTemplate {
    Presubmit,
    Periodic,
}

/// Everything one run mutates. Built fresh for every run so nothing leaks
/// between runs sharing a process.
pub struct RunContext {
    pub options: RunOptions,
    pub base: BaseJobOptions,
    pub render: RenderOptions,
    pub registry: RepositoryRegistry,
    pub index: MetadataIndex,
    pub coverage: CoverageMap,
    executor: TemplateExecutor,
    presubmit_template: String,
    periodic_template: String,
    emitted: usize,
}

impl RunContext {
    pub fn new(
        options: RunOptions,
        engine: TemplateEngine,
        coverage: CoverageMap,
    ) -> Result<Self, GenerateError> {
        let presubmit_template = engine.read_template(PRESUBMIT_TEMPLATE)?.to_string();
        let periodic_template = engine.read_template(PERIODIC_TEMPLATE)?.to_string();
        Ok(RunContext {
            base: options.base_job(),
            render: options.render_options(),
            executor: TemplateExecutor::new(engine, options.job_filter.clone()),
            options,
            registry: RepositoryRegistry::new(),
            index: MetadataIndex::new(),
            coverage,
            presubmit_template,
            periodic_template,
            emitted: 0,
        })
    }

    /// Resolver state borrowed from this run.
    pub fn override_env(&mut self) -> OverrideEnv<'_> {
        OverrideEnv {
            timeout_override: self.options.timeout_override,
            registry: &mut self.registry,
        }
    }

    /// Render and emit one job under `section`.
    pub fn emit<T: Serialize>(
        &mut self,
        template: JobTemplate,
        section: &str,
        repo_key: &str,
        job_name: &str,
        data: &T,
    ) -> Result<(), GenerateError> {
        let (name, text, group_by_repo) = match template {
            JobTemplate::Presubmit => (PRESUBMIT_TEMPLATE, &self.presubmit_template, true),
            JobTemplate::Periodic => (PERIODIC_TEMPLATE, &self.periodic_template, false),
        };
        let target = JobTarget {
            section_title: section,
            repo_name: repo_key,
            job_name,
            group_by_repo,
        };
        if self.executor.execute_job_template(name, text, &target, data)? {
            self.emitted += 1;
        }
        Ok(())
    }

    /// Number of jobs emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn engine(&self) -> &TemplateEngine {
        self.executor.engine()
    }

    /// The rendered job definitions.
    pub fn into_jobs(self) -> String {
        self.executor.into_sink().into_string()
    }
}
