//! Dashboard configuration built from the metadata index.

use serde::Serialize;

use prowgen_core::metadata::build_proj_repo_str;
use prowgen_core::MetadataIndex;

use crate::error::GenerateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestGroup {
    pub name: String,
    pub gcs_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardTab {
    pub name: String,
    pub test_group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub name: String,
    pub dashboard_tab: Vec<DashboardTab>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardGroup {
    pub name: String,
    pub dashboard_names: Vec<String>,
}

/// One test group per job, one dashboard per repository, one dashboard
/// group per project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestgridConfig {
    pub test_groups: Vec<TestGroup>,
    pub dashboards: Vec<Dashboard>,
    pub dashboard_groups: Vec<DashboardGroup>,
}

impl TestgridConfig {
    pub fn from_index(index: &MetadataIndex, gcs_bucket: &str) -> Self {
        let mut config = TestgridConfig::default();
        for (project, repos) in index.iter() {
            let mut dashboard_names = Vec::new();
            for (repo, suffixes) in repos {
                if suffixes.is_empty() {
                    continue;
                }
                let dashboard = build_proj_repo_str(project, repo);
                let mut tabs = Vec::with_capacity(suffixes.len());
                for suffix in suffixes {
                    let group = format!("ci-{dashboard}-{suffix}");
                    config.test_groups.push(TestGroup {
                        gcs_prefix: format!("{gcs_bucket}/logs/{group}"),
                        name: group.clone(),
                    });
                    tabs.push(DashboardTab { name: suffix.clone(), test_group_name: group });
                }
                config.dashboards.push(Dashboard { name: dashboard.clone(), dashboard_tab: tabs });
                dashboard_names.push(dashboard);
            }
            if !dashboard_names.is_empty() {
                config.dashboard_groups.push(DashboardGroup {
                    name: project.to_string(),
                    dashboard_names,
                });
            }
        }
        config
    }

    pub fn to_yaml(&self) -> Result<String, GenerateError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
