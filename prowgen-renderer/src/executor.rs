//! Filtered, section-aware emission of rendered jobs into a [`Sink`].

use std::collections::HashSet;

use serde::Serialize;

use crate::engine::TemplateEngine;
use crate::error::RenderError;
use crate::sink::Sink;

/// Where a rendered job lands in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTarget<'a> {
    pub section_title: &'a str,
    pub repo_name: &'a str,
    pub job_name: &'a str,
    /// Emit a `  <repo>:` header per repository below the section title.
    pub group_by_repo: bool,
}

/// Which section and repository headers were already written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionState {
    emitted: HashSet<(String, Option<String>)>,
}

impl SectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the header for `title` (and `repo`). Returns `true` the first time.
    pub fn mark_emitted(&mut self, title: &str, repo: Option<&str>) -> bool {
        self.emitted.insert((title.to_string(), repo.map(str::to_string)))
    }

    pub fn is_emitted(&self, title: &str, repo: Option<&str>) -> bool {
        self.emitted.contains(&(title.to_string(), repo.map(str::to_string)))
    }

    pub fn reset(&mut self) {
        self.emitted.clear();
    }
}

/// Renders job templates and writes them, with headers, into its [`Sink`].
pub struct TemplateExecutor {
    engine: TemplateEngine,
    job_filter: String,
    sections: SectionState,
    sink: Sink,
}

impl TemplateExecutor {
    /// An empty `job_filter` lets every job through.
    pub fn new(engine: TemplateEngine, job_filter: impl Into<String>) -> Self {
        TemplateExecutor {
            engine,
            job_filter: job_filter.into(),
            sections: SectionState::new(),
            sink: Sink::new(),
        }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn sections_mut(&mut self) -> &mut SectionState {
        &mut self.sections
    }

    pub fn into_sink(self) -> Sink {
        self.sink
    }

    /// Render without emitting.
    pub fn execute<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        template: &str,
        data: &T,
    ) -> Result<String, RenderError> {
        self.engine.execute(name, template, data)
    }

    /// Render and emit one job. Returns `false` when the job name filter
    /// skipped it.
    pub fn execute_job_template<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        template: &str,
        target: &JobTarget<'_>,
        data: &T,
    ) -> Result<bool, RenderError> {
        if !self.job_filter.is_empty() && self.job_filter != target.job_name {
            tracing::debug!(job = target.job_name, filter = %self.job_filter, "job filtered out");
            return Ok(false);
        }

        let body = self.engine.execute(name, template, data)?;

        if self.sections.mark_emitted(target.section_title, None) {
            self.sink.write(&format!("{}:", target.section_title));
        }
        if target.group_by_repo
            && self.sections.mark_emitted(target.section_title, Some(target.repo_name))
        {
            self.sink.write(&format!("  {}:", target.repo_name));
        }
        self.sink.write_block(&body);
        tracing::debug!(job = target.job_name, section = target.section_title, "job emitted");
        Ok(true)
    }
}
