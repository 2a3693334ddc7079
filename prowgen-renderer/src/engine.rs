//! Tera rendering engine with the fixed `indent_*` helper set.
//!
//! | helper                 | output                                          |
//! |------------------------|-------------------------------------------------|
//! | `indent_section`       | `title:` then each item quoted                  |
//! | `indent_array_section` | `title:` then each item as a quoted list entry  |
//! | `indent_keys`          | `title:` then each line verbatim                |
//! | `indent_lines`         | each line verbatim, no title                    |
//!
//! All helpers take `indent` (item indentation; the title sits two columns
//! to the left) and render nothing for an empty list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::error::RenderError;
use crate::lines::quote;

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

pub const PRESUBMIT_TEMPLATE: &str = "presubmit_job.yaml.tera";
pub const PERIODIC_TEMPLATE: &str = "periodic_job.yaml.tera";
pub const PROW_CONFIG_TEMPLATE: &str = "prow_config.yaml.tera";

const TPLS: &[(&str, &str)] = &[
    (PRESUBMIT_TEMPLATE, include_str!("templates/presubmit_job.yaml.tera")),
    (PERIODIC_TEMPLATE, include_str!("templates/periodic_job.yaml.tera")),
    (PROW_CONFIG_TEMPLATE, include_str!("templates/prow_config.yaml.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn indent_arg(args: &HashMap<String, Value>) -> tera::Result<usize> {
    args.get("indent")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| tera::Error::msg("`indent` must be a non-negative integer"))
}

fn title_arg(args: &HashMap<String, Value>) -> tera::Result<&str> {
    args.get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("`title` must be a string"))
}

fn items_arg(args: &HashMap<String, Value>, key: &str) -> tera::Result<Vec<String>> {
    let items = match args.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(tera::Error::msg(format!("`{key}` must be a list"))),
    };
    Ok(items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}

fn titled(indent: usize, title: &str, lines: impl Iterator<Item = String>) -> String {
    let pad = " ".repeat(indent);
    let mut out = format!("{}{title}:", " ".repeat(indent.saturating_sub(2)));
    for line in lines {
        out.push('\n');
        out.push_str(&pad);
        out.push_str(&line);
    }
    out
}

fn indent_section(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let items = items_arg(args, "items")?;
    if items.is_empty() {
        return Ok(Value::String(String::new()));
    }
    let out = titled(indent_arg(args)?, title_arg(args)?, items.iter().map(|i| quote(i)));
    Ok(Value::String(out))
}

fn indent_array_section(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let items = items_arg(args, "items")?;
    if items.is_empty() {
        return Ok(Value::String(String::new()));
    }
    let lines = items.iter().map(|i| format!("- {}", quote(i)));
    Ok(Value::String(titled(indent_arg(args)?, title_arg(args)?, lines)))
}

fn indent_keys(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let lines = items_arg(args, "lines")?;
    if lines.is_empty() {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(titled(indent_arg(args)?, title_arg(args)?, lines.into_iter())))
}

fn indent_lines(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let lines = items_arg(args, "lines")?;
    let pad = " ".repeat(indent_arg(args)?);
    let out: Vec<String> = lines.iter().map(|line| format!("{pad}{line}")).collect();
    Ok(Value::String(out.join("\n")))
}

fn register_helpers(tera: &mut Tera) {
    tera.register_function("indent_section", indent_section);
    tera.register_function("indent_array_section", indent_array_section);
    tera.register_function("indent_keys", indent_keys);
    tera.register_function("indent_lines", indent_lines);
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded defaults.
/// Template names are normalised to lowercase and relative paths.
pub struct TemplateEngine {
    tera: Tera,
    sources: HashMap<String, String>,
}

impl TemplateEngine {
    /// Construct a new [`TemplateEngine`], loading embedded templates plus any
    /// overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let mut sources: HashMap<String, String> = HashMap::new();
        for (name, content) in TPLS {
            sources.insert(normalize_template_name(Path::new(name)), (*content).to_string());
        }
        if let Some(dir) = user_template_dir {
            for (name, content) in load_user_templates(dir)? {
                tracing::debug!(template = %name, "user template override");
                sources.insert(name, content);
            }
        }

        let mut tera = Tera::default();
        register_helpers(&mut tera);
        tera.add_raw_templates(sources.iter().map(|(n, c)| (n.as_str(), c.as_str())))?;
        Ok(TemplateEngine { tera, sources })
    }

    /// Source text of a loaded template.
    pub fn read_template(&self, name: &str) -> Result<&str, RenderError> {
        self.sources
            .get(&normalize_template_name(Path::new(name)))
            .map(String::as_str)
            .ok_or_else(|| RenderError::TemplateNotFound { name: name.to_string() })
    }

    /// Render `template` registered under `name` against `data`.
    ///
    /// The template is (re)compiled only when its text differs from what is
    /// already registered under that name.
    pub fn execute<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        template: &str,
        data: &T,
    ) -> Result<String, RenderError> {
        if self.sources.get(name).map(String::as_str) != Some(template) {
            self.tera.add_raw_template(name, template)?;
            self.sources.insert(name.to_string(), template.to_string());
        }
        self.render(name, data)
    }

    /// Render an already loaded template.
    pub fn render<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
    ) -> Result<String, RenderError> {
        if !self.sources.contains_key(name) {
            return Err(RenderError::TemplateNotFound { name: name.to_string() });
        }
        let ctx = Context::from_value(serde_json::to_value(data)?)?;
        Ok(self.tera.render(name, &ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn engine_new_succeeds() {
        TemplateEngine::new(None).expect("embedded templates should compile");
    }

    #[test]
    fn read_template_returns_cached_text() {
        let engine = TemplateEngine::new(None).unwrap();
        let text = engine.read_template(PERIODIC_TEMPLATE).unwrap();
        assert_eq!(text, include_str!("templates/periodic_job.yaml.tera"));
    }

    #[test]
    fn read_unknown_template_fails() {
        let engine = TemplateEngine::new(None).unwrap();
        let err = engine.read_template("nope.yaml.tera").unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound { .. }));
    }

    #[test]
    fn user_template_overrides_embedded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Periodic_Job.yaml.tera"), "custom {{ name }}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let engine = TemplateEngine::new(Some(dir.path())).unwrap();
        assert_eq!(engine.read_template(PERIODIC_TEMPLATE).unwrap(), "custom {{ name }}");
        assert!(engine.read_template("notes.txt").is_err());
        let out = engine.render(PERIODIC_TEMPLATE, &json!({ "name": "x" })).unwrap();
        assert_eq!(out, "custom x");
    }

    #[test]
    fn indent_section_quotes_items() {
        let mut engine = TemplateEngine::new(None).unwrap();
        let template =
            "\n- foo: {{ foo }}\n{{ indent_section(indent=2, title=\"bar\", items=bar) }}\n";
        let out = engine
            .execute("foo", template, &json!({ "foo": "Foo", "bar": ["Bar", "Baz"] }))
            .unwrap();
        assert_eq!(out, "\n- foo: Foo\nbar:\n  \"Bar\"\n  \"Baz\"\n");
    }

    #[test]
    fn helpers_render_nothing_for_empty_lists() {
        let mut engine = TemplateEngine::new(None).unwrap();
        let template = "[{{ indent_section(indent=4, title=\"t\", items=x) }}\
                        {{ indent_array_section(indent=4, title=\"t\", items=x) }}\
                        {{ indent_keys(indent=4, title=\"t\", lines=x) }}\
                        {{ indent_lines(indent=4, lines=x) }}]";
        let out = engine.execute("empty", template, &json!({ "x": [] })).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn array_keys_and_lines_helpers() {
        let mut engine = TemplateEngine::new(None).unwrap();
        let data = json!({ "args": ["--a", "b"], "env": ["- name: foo", "  value: bar"] });

        let out = engine
            .execute("a", "{{ indent_array_section(indent=6, title=\"args\", items=args) }}", &data)
            .unwrap();
        assert_eq!(out, "    args:\n      - \"--a\"\n      - \"b\"");

        let out = engine
            .execute("k", "{{ indent_keys(indent=4, title=\"env\", lines=env) }}", &data)
            .unwrap();
        assert_eq!(out, "  env:\n    - name: foo\n      value: bar");

        let out = engine.execute("l", "{{ indent_lines(indent=2, lines=env) }}", &data).unwrap();
        assert_eq!(out, "  - name: foo\n    value: bar");
    }

    #[test]
    fn execute_recompiles_changed_template() {
        let mut engine = TemplateEngine::new(None).unwrap();
        assert_eq!(engine.execute("t", "one", &json!({})).unwrap(), "one");
        assert_eq!(engine.execute("t", "two", &json!({})).unwrap(), "two");
    }

    #[test]
    fn render_error_is_reported() {
        let mut engine = TemplateEngine::new(None).unwrap();
        let err = engine.execute("bad", "{{ missing_value }}", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Tera(_)));
    }
}
