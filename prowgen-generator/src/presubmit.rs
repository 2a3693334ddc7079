//! Presubmit jobs, one per job-type entry under `presubmits`.

use prowgen_core::{
    apply_overrides, ConfigMap, JobDescription, Location, RepoKey, Repository, SectionVisitor,
};
use prowgen_renderer::{JobContext, PresubmitContext};

use crate::context::{JobTemplate, RunContext};
use crate::error::GenerateError;

pub const PRESUBMIT_SCRIPT: &str = "./test/presubmit-tests.sh";
pub const COVERAGE_COMMAND: &str = "/coverage";
pub const COVERAGE_SUFFIX: &str = "go-coverage";

const TEST_KINDS: &[&str] = &["build-tests", "unit-tests", "integration-tests"];

/// Job type of one presubmit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PresubmitKind {
    Tests(String),
    Coverage,
    Custom(String),
}

impl PresubmitKind {
    fn suffix(&self) -> &str {
        match self {
            PresubmitKind::Tests(kind) => kind,
            PresubmitKind::Coverage => COVERAGE_SUFFIX,
            PresubmitKind::Custom(name) => name,
        }
    }
}

/// Walks `presubmits` and emits grouped-by-repo jobs.
pub struct PresubmitGenerator<'a> {
    ctx: &'a mut RunContext,
}

impl<'a> PresubmitGenerator<'a> {
    pub fn new(ctx: &'a mut RunContext) -> Self {
        Self { ctx }
    }
}

impl SectionVisitor for PresubmitGenerator<'_> {
    type Error = GenerateError;

    fn generate(
        &mut self,
        title: &str,
        repo_key: &str,
        entries: &ConfigMap,
        location: &Location,
    ) -> Result<(), GenerateError> {
        let mut job = JobDescription::new(repo_key, &self.ctx.base, location)?;
        self.ctx.registry.entry(&RepoKey::from(repo_key));

        let mut kind = None;
        let mut threshold = Repository::DEFAULT_COVERAGE_THRESHOLD;
        let mut overrides = ConfigMap::new();
        for (key, value) in entries.iter() {
            let at = location.child(key);
            match key {
                k if TEST_KINDS.contains(&k) => {
                    if value.expect_bool(&at)? {
                        kind = Some(PresubmitKind::Tests(k.to_string()));
                    }
                }
                "go-coverage" => {
                    if value.expect_bool(&at)? {
                        kind = Some(PresubmitKind::Coverage);
                    }
                }
                "go-coverage-threshold" => threshold = value.expect_u64(&at)?,
                "custom-test" => kind = Some(PresubmitKind::Custom(value.expect_text(&at)?)),
                _ => overrides.push(key, value.clone()),
            }
        }
        let Some(kind) = kind else {
            tracing::debug!(%location, "presubmit entry has no job type");
            return Ok(());
        };

        job.always_run = true;
        match &kind {
            PresubmitKind::Tests(test) => {
                job.command = PRESUBMIT_SCRIPT.to_string();
                job.args = vec![format!("--{test}")];
            }
            PresubmitKind::Coverage => {
                setup_coverage_job(&mut job, threshold);
                let repo = self.ctx.registry.entry(&RepoKey::from(repo_key));
                repo.enable_go_coverage = true;
                repo.go_coverage_threshold = threshold;
            }
            PresubmitKind::Custom(name) => {
                job.command = PRESUBMIT_SCRIPT.to_string();
                job.args = vec!["--run-test".to_string(), format!("./test/{name}.sh")];
            }
        }

        apply_overrides(&mut job, &overrides, &mut self.ctx.override_env(), location)?;
        finish_job(&mut job, location)?;

        let name = format!("pull-{}-{}", job.repo_name_for_job(), kind.suffix());
        if job.needs_monitor {
            job.add_monitoring_pubsub_labels(&name);
        }
        let data = PresubmitContext {
            job: JobContext::new(name.as_str(), &job, &self.ctx.render),
            trigger: format!("(?m)^/test (all|{name}),?(\\s+|$)"),
            rerun_command: format!("/test {name}"),
        };
        self.ctx.emit(JobTemplate::Presubmit, title, repo_key, &name, &data)
    }
}

/// Coverage runs use their own token instead of the service account.
pub(crate) fn setup_coverage_job(job: &mut JobDescription, threshold: u64) {
    job.service_account.clear();
    job.command = COVERAGE_COMMAND.to_string();
    job.args = vec![
        "--artifacts=$(ARTIFACTS)".to_string(),
        format!("--cov-threshold-percentage={threshold}"),
    ];
    job.add_volume("/etc/covbot-token", "covbot-token", true, Vec::new());
    job.add_env("GITHUB_TOKEN", "/etc/covbot-token/token");
}

/// Service-account wiring shared by every generated job.
pub(crate) fn finish_job(
    job: &mut JobDescription,
    location: &Location,
) -> Result<(), GenerateError> {
    job.configure_service_account(location)?;
    if !job.service_account.is_empty() {
        let path = job.service_account.clone();
        job.add_env("GOOGLE_APPLICATION_CREDENTIALS", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use pretty_assertions::assert_eq;
    use prowgen_core::{parse_section, ConfigNode, CoverageMap, DefectKind};
    use prowgen_renderer::TemplateEngine;

    fn run(document: &ConfigMap, options: RunOptions) -> Result<RunContext, GenerateError> {
        let engine = TemplateEngine::new(None).unwrap();
        let mut ctx = RunContext::new(options, engine, CoverageMap::new())?;
        parse_section(document, "presubmits", &mut PresubmitGenerator::new(&mut ctx))?;
        Ok(ctx)
    }

    fn presubmits(repo: &str, elements: Vec<ConfigMap>) -> ConfigMap {
        let elements: Vec<ConfigNode> = elements.into_iter().map(ConfigNode::from).collect();
        ConfigMap::new().with("presubmits", ConfigMap::new().with(repo, elements))
    }

    #[test]
    fn build_tests_job_is_grouped_by_repo() {
        let doc = presubmits("knative/serving", vec![ConfigMap::new().with("build-tests", true)]);
        let ctx = run(&doc, RunOptions::default()).unwrap();
        assert_eq!(ctx.emitted(), 1);
        let jobs = ctx.into_jobs();
        assert!(jobs.starts_with(
            "presubmits:\n  knative/serving:\n  - name: pull-knative-serving-build-tests\n"
        ));
        assert!(jobs.contains("rerun_command: \"/test pull-knative-serving-build-tests\""));
        assert!(jobs.contains("- \"--build-tests\""));
    }

    #[test]
    fn disabled_job_type_emits_nothing() {
        let doc = presubmits("knative/serving", vec![ConfigMap::new().with("unit-tests", false)]);
        let ctx = run(&doc, RunOptions::default()).unwrap();
        assert_eq!(ctx.emitted(), 0);
        assert_eq!(ctx.into_jobs(), "");
    }

    #[test]
    fn coverage_job_records_repository_threshold() {
        let doc = presubmits(
            "knative/serving",
            vec![ConfigMap::new().with("go-coverage", true).with("go-coverage-threshold", 80i64)],
        );
        let ctx = run(&doc, RunOptions::default()).unwrap();
        let repo = ctx.registry.get(&RepoKey::from("knative/serving")).unwrap();
        assert!(repo.enable_go_coverage);
        assert_eq!(repo.go_coverage_threshold, 80);
        let jobs = ctx.into_jobs();
        assert!(jobs.contains("pull-knative-serving-go-coverage"));
        assert!(jobs.contains("--cov-threshold-percentage=80"));
        assert!(jobs.contains("secretName: covbot-token"));
        assert!(!jobs.contains("GOOGLE_APPLICATION_CREDENTIALS"));
    }

    #[test]
    fn custom_test_runs_named_script_with_overrides() {
        let doc = presubmits(
            "knative/serving",
            vec![ConfigMap::new()
                .with("custom-test", "upgrade-tests")
                .with("always-run", false)
                .with_flag("optional")],
        );
        let jobs = run(&doc, RunOptions::default()).unwrap().into_jobs();
        assert!(jobs.contains("- name: pull-knative-serving-upgrade-tests"));
        assert!(jobs.contains("always_run: false"));
        assert!(jobs.contains("    optional: true"));
        assert!(jobs.contains("- \"./test/upgrade-tests.sh\""));
    }

    #[test]
    fn service_account_mount_and_credentials_env() {
        let doc = presubmits("knative/serving", vec![ConfigMap::new().with("build-tests", true)]);
        let jobs = run(&doc, RunOptions::default()).unwrap().into_jobs();
        assert!(jobs.contains("secretName: test-account"));
        assert!(jobs.contains("value: /etc/test-account/service-account.json"));
    }

    #[test]
    fn job_filter_skips_other_jobs() {
        let doc = presubmits(
            "knative/serving",
            vec![
                ConfigMap::new().with("build-tests", true),
                ConfigMap::new().with("unit-tests", true),
            ],
        );
        let options = RunOptions {
            job_filter: "pull-knative-serving-unit-tests".to_string(),
            ..RunOptions::default()
        };
        let ctx = run(&doc, options).unwrap();
        assert_eq!(ctx.emitted(), 1);
        let jobs = ctx.into_jobs();
        assert!(!jobs.contains("build-tests"));
        assert!(jobs.contains("pull-knative-serving-unit-tests"));
    }

    #[test]
    fn unknown_override_is_fatal_with_location() {
        let doc = presubmits(
            "knative/serving",
            vec![ConfigMap::new().with("build-tests", true).with("bogus", "x")],
        );
        let err = run(&doc, RunOptions::default()).err().unwrap();
        match err {
            GenerateError::Config(e) => {
                assert_eq!(e.kind(), DefectKind::UnknownKey);
                assert_eq!(e.location().to_string(), "presubmits > knative/serving > [0]");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn bad_service_account_is_fatal() {
        let doc = presubmits("knative/serving", vec![ConfigMap::new().with("build-tests", true)]);
        let options = RunOptions {
            service_account: "/tmp/key.json".to_string(),
            ..RunOptions::default()
        };
        assert!(matches!(run(&doc, options), Err(GenerateError::Config(_))));
    }
}
