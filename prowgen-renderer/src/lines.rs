//! Text form of a job description's typed records.
//!
//! Each function returns the ordered line group a template splices in with
//! one of the `indent_*` helpers.

use prowgen_core::types::{
    EnvVar, ExtraRef, Label, ReporterConfig, ResourceBlock, SecurityContext, Volume,
};

/// `- name: <name>` / `  value: <value>` per variable.
pub fn env_lines(env: &[EnvVar]) -> Vec<String> {
    env.iter()
        .flat_map(|var| {
            [
                format!("- name: {}", var.name),
                format!("  value: {}", yaml_string(&var.value)),
            ]
        })
        .collect()
}

/// Render `value` bare when YAML reads it back as the same string,
/// otherwise double-quoted (`42` becomes `"42"`).
pub fn yaml_string(value: &str) -> String {
    match serde_yaml::from_str::<serde_yaml::Value>(value) {
        Ok(serde_yaml::Value::String(parsed)) if parsed == value => value.to_string(),
        _ => quote(value),
    }
}

/// JSON string literal, which is also a valid double-quoted YAML scalar.
pub(crate) fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

pub fn volume_mount_lines(volumes: &[Volume]) -> Vec<String> {
    let mut lines = Vec::new();
    for volume in volumes {
        lines.push(format!("- name: {}", volume.name));
        lines.push(format!("  mountPath: {}", volume.mount_path));
        if volume.secret {
            lines.push("  readOnly: true".to_string());
        }
    }
    lines
}

pub fn volume_lines(volumes: &[Volume]) -> Vec<String> {
    let mut lines = Vec::new();
    for volume in volumes {
        lines.push(format!("- name: {}", volume.name));
        if volume.secret {
            lines.push("  secret:".to_string());
            lines.push(format!("    secretName: {}", volume.name));
        }
        lines.extend(volume.source.iter().map(|line| format!("  {line}")));
    }
    lines
}

pub fn label_lines(labels: &[Label]) -> Vec<String> {
    labels.iter().map(|l| format!("{}: {}", l.key, l.value)).collect()
}

pub fn resource_lines(resources: &[ResourceBlock]) -> Vec<String> {
    let mut lines = Vec::new();
    for block in resources {
        lines.push(format!("  {}:", block.kind));
        for (name, quantity) in &block.quantities {
            lines.push(format!("    {name}: {quantity}"));
        }
    }
    lines
}

pub fn reporter_config_lines(config: Option<&ReporterConfig>) -> Vec<String> {
    let Some(slack) = config.and_then(|c| c.slack.as_ref()) else {
        return Vec::new();
    };
    let mut lines = vec!["  slack:".to_string()];
    if let Some(channel) = &slack.channel {
        lines.push(format!("    channel: {channel}"));
    }
    if let Some(template) = &slack.report_template {
        lines.push(format!("    report_template: {template}"));
    }
    lines
}

pub fn security_context_lines(context: Option<&SecurityContext>) -> Vec<String> {
    match context {
        Some(ctx) if ctx.privileged => vec!["privileged: true".to_string()],
        _ => Vec::new(),
    }
}

/// One list item per ref; empty fields are left out.
pub fn extra_ref_lines(refs: &[ExtraRef]) -> Vec<String> {
    let mut lines = Vec::new();
    for extra in refs {
        let fields = [
            ("org", Some(extra.org.as_str())),
            ("repo", Some(extra.repo.as_str())),
            ("base_ref", extra.base_ref.as_deref()),
            ("path_alias", extra.path_alias.as_deref()),
        ];
        let mut first = true;
        for (key, value) in fields {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            let marker = if first { "- " } else { "  " };
            lines.push(format!("{marker}{key}: {value}"));
            first = false;
        }
    }
    lines
}

/// `optional: true` when set, empty otherwise.
pub fn optional_line(optional: bool) -> String {
    if optional {
        "optional: true".to_string()
    } else {
        String::new()
    }
}

pub fn path_alias_line(path_alias: Option<&str>) -> String {
    path_alias
        .map(|alias| format!("path_alias: {alias}"))
        .unwrap_or_default()
}
