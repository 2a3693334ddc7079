//! Per-job override rules.
//!
//! | key               | effect                                              |
//! |-------------------|-----------------------------------------------------|
//! | `skip_branches`   | replace list                                        |
//! | `branches`        | replace list                                        |
//! | `args`            | replace list                                        |
//! | `timeout`         | set minutes; the run's timeout override wins after  |
//! | `command`         | replace                                             |
//! | `needs-monitor`   | flag: monitoring labels                             |
//! | `needs-dind`      | bool: Docker-in-Docker setup                        |
//! | `always-run`      | bool                                                |
//! | `performance`     | flag: repository record gets performance tests      |
//! | `env-vars`        | append `KEY=VALUE` entries                          |
//! | `optional`        | flag                                                |
//! | `resources`       | `requests` / `limits` blocks                        |
//! | `reporter_config` | `slack` block, sibling list = job states to report  |
//!
//! Any other key is a configuration defect.

use crate::error::{ConfigError, Location};
use crate::node::{ConfigMap, ConfigNode};
use crate::types::{
    JobDescription, RepoKey, RepositoryRegistry, ReporterConfig, ResourceBlock, SlackReporter,
};

/// Run state the resolver reads or mutates besides the job itself.
#[derive(Debug)]
pub struct OverrideEnv<'a> {
    /// Replaces any timeout after the entries are applied.
    pub timeout_override: Option<u64>,
    pub registry: &'a mut RepositoryRegistry,
}

/// Apply `entries` to `job` in document order.
pub fn apply_overrides(
    job: &mut JobDescription,
    entries: &ConfigMap,
    env: &mut OverrideEnv<'_>,
    location: &Location,
) -> Result<(), ConfigError> {
    if !job.repo_branch.is_empty() {
        set_base_ref(job);
    }

    for (key, value) in entries.iter() {
        let at = location.child(key);
        match key {
            "skip_branches" => job.skip_branches = value.expect_text_list(&at)?,
            "branches" => job.branches = value.expect_text_list(&at)?,
            "args" => job.args = value.expect_text_list(&at)?,
            "timeout" => job.timeout = value.expect_u64(&at)?,
            "command" => job.command = value.expect_text(&at)?,
            "needs-monitor" => {
                if value.is_flag_set() {
                    job.needs_monitor = true;
                }
            }
            "needs-dind" => {
                if value.expect_bool(&at)? {
                    job.setup_docker_in_docker();
                }
            }
            "always-run" => job.always_run = value.expect_bool(&at)?,
            "performance" => {
                if value.is_flag_set() {
                    env.registry
                        .entry(&RepoKey::from(job.repo_key.as_str()))
                        .enable_performance_tests = true;
                }
            }
            "env-vars" => add_extra_env_vars(job, &value.expect_text_list(&at)?, &at)?,
            "optional" => {
                if value.is_flag_set() {
                    job.optional = true;
                }
            }
            "resources" => set_resources(job, value, &at)?,
            "reporter_config" => set_reporter_config(job, value, &at)?,
            other => {
                return Err(ConfigError::UnknownKey { location: at, key: other.to_string() });
            }
        }
    }

    if let Some(timeout) = env.timeout_override {
        job.timeout = timeout;
    }
    Ok(())
}

/// Append `KEY=VALUE` entries as env vars, split on the first `=`.
pub fn add_extra_env_vars(
    job: &mut JobDescription,
    entries: &[String],
    location: &Location,
) -> Result<(), ConfigError> {
    for entry in entries {
        let (name, value) = entry.split_once('=').ok_or_else(|| ConfigError::MalformedEnvVar {
            location: location.clone(),
            entry: entry.clone(),
        })?;
        job.add_env(name, value);
    }
    Ok(())
}

fn set_base_ref(job: &mut JobDescription) {
    if job.extra_refs.is_empty() {
        job.extra_refs.push(Default::default());
    }
    job.extra_refs[0].base_ref = Some(job.repo_branch.clone());
}

fn set_resources(
    job: &mut JobDescription,
    value: &ConfigNode,
    location: &Location,
) -> Result<(), ConfigError> {
    let mut blocks = Vec::new();
    for (kind, quantities) in value.expect_map(location)?.iter() {
        let at = location.child(kind);
        if kind != "requests" && kind != "limits" {
            return Err(ConfigError::UnknownKey { location: at, key: kind.to_string() });
        }
        let quantities = quantities
            .expect_map(&at)?
            .iter()
            .map(|(name, amount)| Ok((name.to_string(), amount.expect_text(&at.child(name))?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        blocks.push(ResourceBlock { kind: kind.to_string(), quantities });
    }
    job.resources = blocks;
    Ok(())
}

fn set_reporter_config(
    job: &mut JobDescription,
    value: &ConfigNode,
    location: &Location,
) -> Result<(), ConfigError> {
    let mut config = ReporterConfig::default();
    for (reporter, settings) in value.expect_map(location)?.iter() {
        let at = location.child(reporter);
        if reporter != "slack" {
            return Err(ConfigError::UnknownKey { location: at, key: reporter.to_string() });
        }
        let mut slack = SlackReporter::default();
        for (field, node) in settings.expect_map(&at)?.iter() {
            match (field, node) {
                ("channel", _) => slack.channel = Some(node.expect_text(&at.child(field))?),
                ("report_template", _) => {
                    slack.report_template = Some(node.expect_text(&at.child(field))?)
                }
                (_, ConfigNode::Sequence(_)) => {
                    job.job_states_to_report = node.expect_text_list(&at.child(field))?
                }
                _ => tracing::debug!(%at, field, "ignoring unrecognized slack field"),
            }
        }
        config.slack = Some(slack);
    }
    job.reporter_config = Some(config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnvVar, SecurityContext};
    use pretty_assertions::assert_eq;

    fn loc() -> Location {
        Location::root("periodics").child("foo/foo_repo").index(0)
    }

    fn resources() -> ConfigMap {
        ConfigMap::new()
            .with("requests", ConfigMap::new().with("memory", "12Gi").with("disk", "12Ti"))
            .with("limits", ConfigMap::new().with("memory", "16Gi").with("disk", "16Ti"))
    }

    fn reporter_config() -> ConfigMap {
        ConfigMap::new().with(
            "slack",
            ConfigMap::new()
                .with("channel", "serving-api")
                .with("report_template", "Report Template")
                .with("foo", vec![ConfigNode::from("bar"), ConfigNode::from("baz")]),
        )
    }

    fn list(items: &[&str]) -> ConfigNode {
        ConfigNode::Sequence(items.iter().map(|s| ConfigNode::from(*s)).collect())
    }

    fn full_config() -> ConfigMap {
        ConfigMap::new()
            .with("skip_branches", list(&["skip", "branches"]))
            .with("branches", list(&["branch1", "branch2"]))
            .with("args", list(&["arg1", "arg2"]))
            .with("timeout", 42)
            .with("command", "foo_command")
            .with_flag("needs-monitor")
            .with("needs-dind", true)
            .with("always-run", true)
            .with_flag("performance")
            .with("env-vars", list(&["foo=bar"]))
            .with_flag("optional")
            .with("resources", resources())
            .with("reporter_config", reporter_config())
    }

    #[test]
    fn applies_every_recognized_override() {
        let mut registry = RepositoryRegistry::new();
        let key = RepoKey::from("foo/foo_repo");
        registry.entry(&key);
        let mut job = JobDescription {
            repo_key: key.0.clone(),
            repo_branch: "my_repo_branch".to_string(),
            ..Default::default()
        };
        let mut env = OverrideEnv { timeout_override: None, registry: &mut registry };

        apply_overrides(&mut job, &full_config(), &mut env, &loc()).unwrap();

        assert_eq!(job.extra_refs[0].base_ref.as_deref(), Some("my_repo_branch"));
        assert_eq!(job.skip_branches, ["skip", "branches"]);
        assert_eq!(job.branches, ["branch1", "branch2"]);
        assert_eq!(job.args, ["arg1", "arg2"]);
        assert_eq!(job.timeout, 42);
        assert_eq!(job.command, "foo_command");
        assert!(job.needs_monitor);
        assert!(job.always_run);
        assert!(job.optional);
        assert_eq!(job.security_context, Some(SecurityContext { privileged: true }));
        assert!(registry.get(&key).unwrap().enable_performance_tests);
        // The first env var comes from the Docker-in-Docker setup.
        assert_eq!(job.env[1], EnvVar { name: "foo".into(), value: "bar".into() });
        assert_eq!(
            job.resources,
            vec![
                ResourceBlock {
                    kind: "requests".into(),
                    quantities: vec![
                        ("memory".into(), "12Gi".into()),
                        ("disk".into(), "12Ti".into()),
                    ],
                },
                ResourceBlock {
                    kind: "limits".into(),
                    quantities: vec![
                        ("memory".into(), "16Gi".into()),
                        ("disk".into(), "16Ti".into()),
                    ],
                },
            ]
        );
        let slack = job.reporter_config.unwrap().slack.unwrap();
        assert_eq!(slack.channel.as_deref(), Some("serving-api"));
        assert_eq!(slack.report_template.as_deref(), Some("Report Template"));
        assert_eq!(job.job_states_to_report, ["bar", "baz"]);
    }

    #[test]
    fn timeout_override_wins() {
        let mut registry = RepositoryRegistry::new();
        let mut job = JobDescription::default();
        let mut env = OverrideEnv { timeout_override: Some(999), registry: &mut registry };
        let config = ConfigMap::new().with("timeout", 42);
        apply_overrides(&mut job, &config, &mut env, &loc()).unwrap();
        assert_eq!(job.timeout, 999);
    }

    #[test]
    fn replace_overrides_are_idempotent() {
        let mut registry = RepositoryRegistry::new();
        let mut env = OverrideEnv { timeout_override: None, registry: &mut registry };
        let config = ConfigMap::new()
            .with("branches", list(&["main"]))
            .with("args", list(&["--x"]))
            .with("command", "run.sh")
            .with("timeout", 7);
        let mut once = JobDescription::default();
        apply_overrides(&mut once, &config, &mut env, &loc()).unwrap();
        let mut twice = once.clone();
        apply_overrides(&mut twice, &config, &mut env, &loc()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn env_vars_split_on_first_equals() {
        let mut job = JobDescription::default();
        add_extra_env_vars(&mut job, &["foo=bar=baz".to_string()], &loc()).unwrap();
        assert_eq!(job.env[0], EnvVar { name: "foo".into(), value: "bar=baz".into() });
    }

    #[test]
    fn env_var_without_equals_is_fatal() {
        let mut job = JobDescription::default();
        let err = add_extra_env_vars(&mut job, &["foobar".to_string()], &loc()).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedEnvVar { ref entry, .. } if entry == "foobar"));
    }

    #[test]
    fn unknown_key_is_fatal() {
        let mut registry = RepositoryRegistry::new();
        let mut env = OverrideEnv { timeout_override: None, registry: &mut registry };
        let mut job = JobDescription::default();
        let config = ConfigMap::new().with("no-such-override", true);
        let err = apply_overrides(&mut job, &config, &mut env, &loc()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownKey { ref key, .. } if key == "no-such-override"
        ));
        assert_eq!(
            err.location().to_string(),
            "periodics > foo/foo_repo > [0] > no-such-override"
        );
    }

    #[test]
    fn unknown_resource_block_is_fatal() {
        let mut registry = RepositoryRegistry::new();
        let mut env = OverrideEnv { timeout_override: None, registry: &mut registry };
        let mut job = JobDescription::default();
        let config = ConfigMap::new()
            .with("resources", ConfigMap::new().with("quotas", ConfigMap::new().with("cpu", "1")));
        let err = apply_overrides(&mut job, &config, &mut env, &loc()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key, .. } if key == "quotas"));
        assert_eq!(
            err.location().to_string(),
            "periodics > foo/foo_repo > [0] > resources > quotas"
        );
    }

    #[test]
    fn false_flags_leave_job_untouched() {
        let mut registry = RepositoryRegistry::new();
        let mut env = OverrideEnv { timeout_override: None, registry: &mut registry };
        let mut job = JobDescription::default();
        let config = ConfigMap::new()
            .with("needs-dind", false)
            .with("optional", false)
            .with("needs-monitor", false);
        apply_overrides(&mut job, &config, &mut env, &loc()).unwrap();
        assert_eq!(job, JobDescription::default());
    }
}
