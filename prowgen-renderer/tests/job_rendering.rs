use pretty_assertions::assert_eq;
use prowgen_core::types::{ResourceBlock, SlackReporter, ReporterConfig};
use prowgen_core::{BaseJobOptions, JobDescription, Location};
use prowgen_renderer::{
    JobContext, JobTarget, PeriodicContext, PresubmitContext, RenderOptions, TemplateEngine,
    TemplateExecutor, PERIODIC_TEMPLATE, PRESUBMIT_TEMPLATE, PROW_CONFIG_TEMPLATE,
};
use serde_yaml::Value;

fn base() -> BaseJobOptions {
    BaseJobOptions {
        image: "gcr.io/knative-tests/test-infra/prow-tests:stable".to_string(),
        timeout: 50,
        service_account: "/etc/test-account/service-account.json".to_string(),
        path_alias_orgs: ["knative".to_string()].into_iter().collect(),
        ..BaseJobOptions::default()
    }
}

fn job() -> JobDescription {
    let loc = Location::root("presubmits");
    let mut job = JobDescription::new("knative/serving", &base(), &loc).unwrap();
    job.command = "runner.sh".to_string();
    job.args = vec!["./test/presubmit-tests.sh".to_string(), "--build-tests".to_string()];
    job.always_run = true;
    job.optional = true;
    job.configure_service_account(&loc).unwrap();
    job.setup_docker_in_docker();
    job.add_env("GOOGLE_APPLICATION_CREDENTIALS", job.service_account.clone());
    job.add_env("REPEAT", "42");
    job.resources = vec![ResourceBlock {
        kind: "requests".to_string(),
        quantities: vec![("memory".to_string(), "12Gi".to_string())],
    }];
    job
}

fn executor() -> (TemplateExecutor, String, String) {
    let engine = TemplateEngine::new(None).unwrap();
    let presubmit = engine.read_template(PRESUBMIT_TEMPLATE).unwrap().to_string();
    let periodic = engine.read_template(PERIODIC_TEMPLATE).unwrap().to_string();
    (TemplateExecutor::new(engine, ""), presubmit, periodic)
}

fn env_value<'a>(container: &'a Value, name: &str) -> &'a Value {
    container["env"]
        .as_sequence()
        .unwrap()
        .iter()
        .find(|e| e["name"] == Value::from(name))
        .map(|e| &e["value"])
        .unwrap_or_else(|| panic!("env {name} missing"))
}

#[test]
fn presubmit_renders_valid_grouped_yaml() {
    let (mut exec, presubmit, _) = executor();
    let name = "pull-knative-serving-build-tests";
    let ctx = PresubmitContext {
        job: JobContext::new(name, &job(), &RenderOptions::default()),
        trigger: format!("(?m)^/test (all|{name}),?(\\s+|$)"),
        rerun_command: format!("/test {name}"),
    };
    let target = JobTarget {
        section_title: "presubmits",
        repo_name: "knative/serving",
        job_name: name,
        group_by_repo: true,
    };
    exec.execute_job_template(PRESUBMIT_TEMPLATE, &presubmit, &target, &ctx).unwrap();

    let text = exec.sink().as_str();
    assert!(text.starts_with(
        "presubmits:\n  knative/serving:\n  - name: pull-knative-serving-build-tests\n"
    ));

    let doc: Value = serde_yaml::from_str(text).unwrap();
    let job = &doc["presubmits"]["knative/serving"][0];
    assert_eq!(job["optional"], Value::from(true));
    assert_eq!(job["path_alias"], Value::from("knative.dev/serving"));
    assert_eq!(job["decoration_config"]["timeout"], Value::from("50m"));
    assert_eq!(job["trigger"], Value::from(ctx.trigger.as_str()));

    let container = &job["spec"]["containers"][0];
    assert_eq!(container["securityContext"]["privileged"], Value::from(true));
    assert_eq!(container["resources"]["requests"]["memory"], Value::from("12Gi"));
    assert_eq!(env_value(container, "REPEAT"), &Value::from("42"));
    assert_eq!(env_value(container, "DOCKER_IN_DOCKER_ENABLED"), &Value::from("true"));
    assert_eq!(
        container["command"].as_sequence().unwrap().len(),
        3,
        "command should be runner plus two args"
    );

    let volumes = job["spec"]["volumes"].as_sequence().unwrap();
    assert_eq!(volumes[0]["secret"]["secretName"], Value::from("test-account"));
    assert_eq!(volumes[1]["emptyDir"], Value::Mapping(Default::default()));
}

#[test]
fn periodic_renders_repo_ref_extra_refs_and_reporter() {
    let (mut exec, _, periodic) = executor();
    let mut job = job();
    job.repo_branch = "release-0.15".to_string();
    job.extra_refs[0].base_ref = Some(job.repo_branch.clone());
    job.add_monitoring_pubsub_labels("ci-knative-serving-0.15-continuous");
    job.reporter_config = Some(ReporterConfig {
        slack: Some(SlackReporter {
            channel: Some("serving-api".to_string()),
            report_template: Some("Report Template".to_string()),
        }),
    });
    job.job_states_to_report = vec!["failure".to_string(), "error".to_string()];

    let name = "ci-knative-serving-0.15-continuous";
    let ctx = PeriodicContext {
        job: JobContext::new(name, &job, &RenderOptions::default()),
        cron: "7 */2 * * *".to_string(),
    };
    let target = JobTarget {
        section_title: "periodics",
        repo_name: "knative/serving",
        job_name: name,
        group_by_repo: false,
    };
    exec.execute_job_template(PERIODIC_TEMPLATE, &periodic, &target, &ctx).unwrap();

    let doc: Value = serde_yaml::from_str(exec.sink().as_str()).unwrap();
    let job = &doc["periodics"][0];
    assert_eq!(job["cron"], Value::from("7 */2 * * *"));
    assert_eq!(job["extra_refs"][0]["base_ref"], Value::from("release-0.15"));
    assert_eq!(job["extra_refs"][0]["path_alias"], Value::from("knative.dev/serving"));
    assert_eq!(job["labels"]["prow.k8s.io/pubsub.runID"], Value::from(name));
    assert_eq!(job["reporter_config"]["slack"]["channel"], Value::from("serving-api"));
    assert_eq!(
        job["reporter_config"]["slack"]["job_states_to_report"],
        serde_yaml::from_str::<Value>("[failure, error]").unwrap()
    );
    let container = &job["spec"]["containers"][0];
    assert_eq!(
        env_value(container, "REPO_REF"),
        &Value::from("github.com/knative/serving=release-0.15")
    );
}

#[test]
fn repository_override_and_pre_command_apply_at_render_time() {
    let options = RenderOptions {
        pre_command: "/usr/local/bin/wrap".to_string(),
        repository_override: "github.com/fork/serving".to_string(),
    };
    let job = job();
    let ctx = JobContext::new("x", &job, &options);
    assert_eq!(ctx.command[0], "/usr/local/bin/wrap");
    assert_eq!(ctx.repo_ref, "github.com/fork/serving");
    assert_eq!(job.command, "runner.sh");
}

#[test]
fn prow_config_lists_tide_repos() {
    let engine = TemplateEngine::new(None).unwrap();
    let data = serde_json::json!({
        "tide_repos": ["knative/serving", "knative/test-infra"],
        "test_infra_repo": "knative/test-infra",
    });
    let out = engine.render(PROW_CONFIG_TEMPLATE, &data).unwrap();
    let doc: Value = serde_yaml::from_str(&out).unwrap();
    assert_eq!(doc["tide"]["queries"][0]["repos"][1], Value::from("knative/test-infra"));
    assert_eq!(doc["tide"]["merge_method"]["knative/serving"], Value::from("squash"));
    assert_eq!(doc["in_repo_config"]["enabled"]["knative/test-infra"], Value::from(true));
}
