//! Shared generation pipeline entrypoint used by `generate` and `diff`.

use prowgen_core::metadata::{add_remaining_test_coverage_jobs, collect_metadata};
use prowgen_core::{parse_section, ConfigMap, CoverageMap, Location, MetadataIndex};
use prowgen_renderer::{TemplateEngine, PROW_CONFIG_TEMPLATE};

use crate::context::{RunContext, RunOptions, PERIODICS_SECTION, PRESUBMITS_SECTION};
use crate::error::GenerateError;
use crate::periodic::PeriodicGenerator;
use crate::presubmit::PresubmitGenerator;
use crate::prow::ProwConfigData;
use crate::testgrid::TestgridConfig;

/// Everything one run produces, held in memory until the caller writes it.
#[derive(Debug, Clone)]
pub struct GeneratedOutput {
    pub jobs: String,
    pub testgrid: String,
    pub prow_config: String,
    pub metadata: MetadataIndex,
    pub job_count: usize,
}

fn section<'d>(
    document: &'d ConfigMap,
    title: &str,
) -> Result<Option<&'d ConfigMap>, GenerateError> {
    match document.get(title) {
        None => Ok(None),
        Some(node) if node.is_absent() => Ok(None),
        Some(node) => Ok(Some(node.expect_map(&Location::root(title))?)),
    }
}

/// Run one full generation over `document`.
///
/// Any configuration defect aborts the run; no partial output is returned.
pub fn generate(
    document: &ConfigMap,
    options: RunOptions,
    engine: TemplateEngine,
) -> Result<GeneratedOutput, GenerateError> {
    let presubmits = section(document, PRESUBMITS_SECTION)?;
    let periodics = section(document, PERIODICS_SECTION)?;

    let coverage = match presubmits {
        Some(map) => CoverageMap::from_presubmits(map)?,
        None => CoverageMap::new(),
    };
    let prow_data = presubmits.map(ProwConfigData::from_presubmits).unwrap_or_default();
    let gcs_bucket = options.gcs_bucket.clone();

    let mut ctx = RunContext::new(options, engine, coverage)?;
    parse_section(document, PRESUBMITS_SECTION, &mut PresubmitGenerator::new(&mut ctx))?;
    let mut periodic = PeriodicGenerator::new(&mut ctx);
    parse_section(document, PERIODICS_SECTION, &mut periodic)?;
    periodic.generate_post_walk()?;

    let mut index = std::mem::take(&mut ctx.index);
    let mut coverage = std::mem::take(&mut ctx.coverage);
    if let Some(map) = periodics {
        collect_metadata(map, &mut index, &mut coverage)?;
    }
    add_remaining_test_coverage_jobs(&mut index, &mut coverage);

    let testgrid = TestgridConfig::from_index(&index, &gcs_bucket).to_yaml()?;
    let prow_config = ctx.engine().render(PROW_CONFIG_TEMPLATE, &prow_data)?;
    let job_count = ctx.emitted();
    tracing::debug!(
        jobs = job_count,
        projects = index.project_names().count(),
        "generation finished"
    );

    Ok(GeneratedOutput {
        jobs: ctx.into_jobs(),
        testgrid,
        prow_config,
        metadata: index,
        job_count,
    })
}
