//! Merge-automation (tide) data for the prow configuration.

use serde::Serialize;

use prowgen_core::ConfigMap;

const TEST_INFRA_SUFFIX: &str = "test-infra";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProwConfigData {
    /// Every repository with presubmits, sorted and de-duplicated.
    pub tide_repos: Vec<String>,
    /// First repository whose key ends in `test-infra`, empty if none.
    pub test_infra_repo: String,
}

impl ProwConfigData {
    pub fn from_presubmits(presubmits: &ConfigMap) -> Self {
        let mut tide_repos: Vec<String> = presubmits.keys().map(str::to_string).collect();
        let test_infra_repo = tide_repos
            .iter()
            .find(|repo| repo.ends_with(TEST_INFRA_SUFFIX))
            .cloned()
            .unwrap_or_default();
        tide_repos.sort();
        tide_repos.dedup();
        ProwConfigData { tide_repos, test_infra_repo }
    }
}
