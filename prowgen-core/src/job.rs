//! Construction-time mutators for [`JobDescription`].

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ConfigError, Location};
use crate::types::{
    EnvVar, ExtraRef, JobDescription, Label, RepoKey, SecurityContext, Volume,
};

/// Domain used for Go import path aliases.
pub const PATH_ALIAS_DOMAIN: &str = "knative.dev";

const MONITORING_PUBSUB_PROJECT: &str = "knative-tests";
const MONITORING_PUBSUB_TOPIC: &str = "knative-monitoring";

/// Run-wide inputs for building a job's base description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseJobOptions {
    pub image: String,
    pub timeout: u64,
    pub service_account: String,
    /// Orgs whose repositories get a `knative.dev/<repo>` path alias.
    pub path_alias_orgs: BTreeSet<String>,
    /// `<org>/<repo>` keys excluded from path aliasing.
    pub non_path_alias_repos: BTreeSet<String>,
}

impl JobDescription {
    /// Base description for a job of repository `repo_key` (`<org>/<repo>`).
    pub fn new(
        repo_key: &str,
        base: &BaseJobOptions,
        location: &Location,
    ) -> Result<Self, ConfigError> {
        let key = RepoKey::from(repo_key);
        let (org, repo) = key.split().ok_or_else(|| ConfigError::InvalidRepoKey {
            location: location.clone(),
            key: repo_key.to_string(),
        })?;

        let path_alias = path_alias_for(org, repo, repo_key, base);
        Ok(JobDescription {
            repo_key: repo_key.to_string(),
            org: org.to_string(),
            repo_name: repo.to_string(),
            repo_uri: format!("github.com/{repo_key}"),
            path_alias: path_alias.clone(),
            image: base.image.clone(),
            timeout: base.timeout,
            service_account: base.service_account.clone(),
            extra_refs: vec![ExtraRef {
                org: org.to_string(),
                repo: repo.to_string(),
                base_ref: None,
                path_alias,
            }],
            ..JobDescription::default()
        })
    }

    /// Repository name with `/` replaced, for use inside job names.
    pub fn repo_name_for_job(&self) -> String {
        self.repo_key.replace('/', "-")
    }

    pub fn add_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.push(EnvVar { name: name.into(), value: value.into() });
    }

    pub fn add_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.push(Label { key: key.into(), value: value.into() });
    }

    /// The three pubsub labels that route a job's results to monitoring.
    pub fn add_monitoring_pubsub_labels(&mut self, run_id: &str) {
        self.add_label("prow.k8s.io/pubsub.project", MONITORING_PUBSUB_PROJECT);
        self.add_label("prow.k8s.io/pubsub.topic", MONITORING_PUBSUB_TOPIC);
        self.add_label("prow.k8s.io/pubsub.runID", run_id);
    }

    pub fn add_volume(
        &mut self,
        mount_path: impl Into<String>,
        name: impl Into<String>,
        secret: bool,
        source: Vec<String>,
    ) {
        self.volumes.push(Volume {
            name: name.into(),
            mount_path: mount_path.into(),
            secret,
            source,
        });
    }

    /// Volumes, env and privileges needed to run Docker inside the job.
    pub fn setup_docker_in_docker(&mut self) {
        self.add_volume("/docker-graph", "docker-graph", false, vec!["emptyDir: {}".to_string()]);
        self.add_volume(
            "/lib/modules",
            "modules",
            false,
            host_path("/lib/modules"),
        );
        self.add_volume(
            "/sys/fs/cgroup",
            "cgroup",
            false,
            host_path("/sys/fs/cgroup"),
        );
        self.add_env("DOCKER_IN_DOCKER_ENABLED", "true");
        self.security_context = Some(SecurityContext { privileged: true });
    }

    /// Mount the service-account secret named by `service_account`.
    ///
    /// The path must be `/etc/<name>/service-account.json`; the secret
    /// `<name>` is mounted read-only at `/etc/<name>`. An empty path is a no-op.
    pub fn configure_service_account(&mut self, location: &Location) -> Result<(), ConfigError> {
        if self.service_account.is_empty() {
            return Ok(());
        }
        let name = service_account_pattern()
            .captures(&self.service_account)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ConfigError::ServiceAccountPath {
                location: location.clone(),
                path: self.service_account.clone(),
            })?;
        self.add_volume(format!("/etc/{name}"), name, true, Vec::new());
        Ok(())
    }
}

fn path_alias_for(org: &str, repo: &str, repo_key: &str, base: &BaseJobOptions) -> Option<String> {
    if base.path_alias_orgs.contains(org) && !base.non_path_alias_repos.contains(repo_key) {
        Some(format!("{PATH_ALIAS_DOMAIN}/{repo}"))
    } else {
        None
    }
}

fn host_path(path: &str) -> Vec<String> {
    vec![
        "hostPath:".to_string(),
        format!("  path: {path}"),
        "  type: Directory".to_string(),
    ]
}

fn service_account_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/etc/([^/]+)/service-account\.json$")
            .expect("service account pattern is valid")
    })
}
