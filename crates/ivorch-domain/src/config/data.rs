use serde::{Deserialize, Serialize};

/// On-disk layout for ingestion artifacts, event logs, and outcomes
/// (spec.md §3; `IngestionArtifact` format fixed in SPEC_FULL.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "d_data_root")]
    pub data_root: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { data_root: d_data_root() }
    }
}

fn d_data_root() -> String {
    "./data".into()
}
