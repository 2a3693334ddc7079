//! Template context: the serializable rendering payload built from [`JobDescription`].

use serde::Serialize;

use prowgen_core::types::JobDescription;

use crate::lines;

/// Run-wide switches that change how a job is rendered but are never
/// stored on the job itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Prepended to every job command.
    pub pre_command: String,
    /// Replaces every job's repository reference when non-empty.
    pub repository_override: String,
}

/// Flat rendering payload shared by all job templates.
#[derive(Debug, Clone, Serialize)]
pub struct JobContext {
    pub name: String,
    pub org: String,
    pub repo_key: String,
    pub repo_name: String,
    /// `REPO_REF` value, see [`github_repo`].
    pub repo_ref: String,
    pub image: String,
    pub command: Vec<String>,
    pub timeout: u64,
    pub always_run: bool,
    pub optional: String,
    pub path_alias: String,
    pub branches: Vec<String>,
    pub skip_branches: Vec<String>,
    pub service_account: String,
    pub env: Vec<String>,
    pub volume_mounts: Vec<String>,
    pub volumes: Vec<String>,
    pub labels: Vec<String>,
    pub resources: Vec<String>,
    pub reporter_config: Vec<String>,
    pub job_states_to_report: Vec<String>,
    pub security_context: Vec<String>,
    pub extra_refs: Vec<String>,
}

impl JobContext {
    pub fn new(name: impl Into<String>, job: &JobDescription, options: &RenderOptions) -> Self {
        JobContext {
            name: name.into(),
            org: job.org.clone(),
            repo_key: job.repo_key.clone(),
            repo_name: job.repo_name.clone(),
            repo_ref: github_repo(job, &options.repository_override),
            image: job.image.clone(),
            command: create_command(job, &options.pre_command),
            timeout: job.timeout,
            always_run: job.always_run,
            optional: lines::optional_line(job.optional),
            path_alias: lines::path_alias_line(job.path_alias.as_deref()),
            branches: job.branches.clone(),
            skip_branches: job.skip_branches.clone(),
            service_account: job.service_account.clone(),
            env: lines::env_lines(&job.env),
            volume_mounts: lines::volume_mount_lines(&job.volumes),
            volumes: lines::volume_lines(&job.volumes),
            labels: lines::label_lines(&job.labels),
            resources: lines::resource_lines(&job.resources),
            reporter_config: lines::reporter_config_lines(job.reporter_config.as_ref()),
            job_states_to_report: job.job_states_to_report.clone(),
            security_context: lines::security_context_lines(job.security_context.as_ref()),
            extra_refs: lines::extra_ref_lines(&job.extra_refs),
        }
    }
}

/// Presubmit payload: the shared job fields plus trigger settings.
#[derive(Debug, Clone, Serialize)]
pub struct PresubmitContext {
    #[serde(flatten)]
    pub job: JobContext,
    pub trigger: String,
    pub rerun_command: String,
}

/// Periodic payload: the shared job fields plus the schedule.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodicContext {
    #[serde(flatten)]
    pub job: JobContext,
    pub cron: String,
}

/// Command line of a job: `[pre_command?, command, args...]`.
pub fn create_command(job: &JobDescription, pre_command: &str) -> Vec<String> {
    let mut command = Vec::with_capacity(job.args.len() + 2);
    if !pre_command.is_empty() {
        command.push(pre_command.to_string());
    }
    if !job.command.is_empty() {
        command.push(job.command.clone());
    }
    command.extend(job.args.iter().cloned());
    command
}

/// The repository reference a job checks out.
///
/// A non-empty `repository_override` always wins; otherwise `repo_uri`,
/// suffixed with `=<branch>` when the job has a branch.
pub fn github_repo(job: &JobDescription, repository_override: &str) -> String {
    if !repository_override.is_empty() {
        return repository_override.to_string();
    }
    if job.repo_branch.is_empty() {
        job.repo_uri.clone()
    } else {
        format!("{}={}", job.repo_uri, job.repo_branch)
    }
}
