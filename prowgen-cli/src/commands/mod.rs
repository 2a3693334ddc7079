//! Subcommands and the flags they share.

pub mod diff;
pub mod generate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use prowgen_core::load_document;
use prowgen_generator::context::{DEFAULT_GCS_BUCKET, DEFAULT_IMAGE, DEFAULT_SERVICE_ACCOUNT};
use prowgen_generator::{generate, GeneratedOutput, RunOptions};
use prowgen_renderer::TemplateEngine;

/// Flags controlling one generation run.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Job configuration document.
    #[arg(long, env = "PROWGEN_CONFIG")]
    pub config: PathBuf,

    /// Emit only the job with exactly this name.
    #[arg(long, env = "PROWGEN_JOB_FILTER", default_value = "")]
    pub job_filter: String,

    /// Replace every job's timeout (minutes).
    #[arg(long, env = "PROWGEN_TIMEOUT_OVERRIDE")]
    pub timeout_override: Option<u64>,

    /// Replace every job's repository reference.
    #[arg(long, env = "PROWGEN_REPO_OVERRIDE", default_value = "")]
    pub repo_override: String,

    /// Command prepended to every job command.
    #[arg(long, env = "PROWGEN_PRE_COMMAND", default_value = "")]
    pub pre_command: String,

    /// Org whose repositories get a Go path alias (repeatable).
    #[arg(long = "path-alias-org", env = "PROWGEN_PATH_ALIAS_ORGS", value_delimiter = ',')]
    pub path_alias_orgs: Vec<String>,

    /// `<org>/<repo>` excluded from path aliasing (repeatable).
    #[arg(
        long = "non-path-alias-repo",
        env = "PROWGEN_NON_PATH_ALIAS_REPOS",
        value_delimiter = ','
    )]
    pub non_path_alias_repos: Vec<String>,

    /// Container image for generated jobs.
    #[arg(long, env = "PROWGEN_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Service account key path, `/etc/<name>/service-account.json`.
    #[arg(long, env = "PROWGEN_SERVICE_ACCOUNT", default_value = DEFAULT_SERVICE_ACCOUNT)]
    pub service_account: String,

    /// Bucket holding job logs, for dashboard test groups.
    #[arg(long, env = "PROWGEN_GCS_BUCKET", default_value = DEFAULT_GCS_BUCKET)]
    pub gcs_bucket: String,

    /// Directory of `.tera` files overriding the built-in templates.
    #[arg(long, env = "PROWGEN_TEMPLATE_DIR")]
    pub template_dir: Option<PathBuf>,
}

/// Where each artifact goes.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Job definitions output; stdout when omitted.
    #[arg(long, env = "PROWGEN_JOBS_OUTPUT")]
    pub jobs_output: Option<PathBuf>,

    /// Dashboard configuration output.
    #[arg(long, env = "PROWGEN_TESTGRID_OUTPUT")]
    pub testgrid_output: Option<PathBuf>,

    /// Tide configuration output.
    #[arg(long, env = "PROWGEN_PROW_CONFIG_OUTPUT")]
    pub prow_config_output: Option<PathBuf>,
}

impl OutputArgs {
    /// `(path, content)` for every artifact with a destination.
    pub fn targets<'o>(&self, output: &'o GeneratedOutput) -> Vec<(PathBuf, &'o str)> {
        [
            (&self.jobs_output, output.jobs.as_str()),
            (&self.testgrid_output, output.testgrid.as_str()),
            (&self.prow_config_output, output.prow_config.as_str()),
        ]
        .into_iter()
        .filter_map(|(path, content)| path.clone().map(|p| (p, content)))
        .collect()
    }
}

impl RunArgs {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            job_filter: self.job_filter.clone(),
            timeout_override: self.timeout_override,
            repository_override: self.repo_override.clone(),
            pre_command: self.pre_command.clone(),
            path_alias_orgs: self.path_alias_orgs.iter().cloned().collect(),
            non_path_alias_repos: self.non_path_alias_repos.iter().cloned().collect(),
            image: self.image.clone(),
            service_account: self.service_account.clone(),
            gcs_bucket: self.gcs_bucket.clone(),
            template_dir: self.template_dir.clone(),
        }
    }

    /// Load the document and run the generator entirely in memory.
    pub fn execute(&self) -> Result<GeneratedOutput> {
        let document = load_document(&self.config)
            .with_context(|| format!("could not load {}", self.config.display()))?;
        let engine = TemplateEngine::new(self.template_dir.as_deref())
            .context("could not load templates")?;
        generate(&document, self.options(), engine)
            .with_context(|| format!("generation failed for {}", self.config.display()))
    }
}
