pub mod cell;
pub mod chart;
pub mod dataset;
pub mod events;
pub mod params;
pub mod skill;

pub use cell::{Cell, CellKind};
pub use chart::{ChartConfig, ChartType};
pub use dataset::{DataError, Dataset, DatasetRegistry, DatasetSource, FailureKind, Row};

pub mod settings {
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;

    fn default_max_datasets() -> usize {
        crate::dataset::MAX_DATASETS
    }

    fn default_top_n() -> usize {
        20
    }

    fn default_query_limit() -> usize {
        10
    }

    fn default_null_label() -> String {
        "Nulo".into()
    }

    fn default_fill_value() -> String {
        "Desconocido".into()
    }

    /// Chart resolution heuristics
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ChartSettings {
        /// Emergency aggregation only looks at charts with more rows than this
        pub aggregation_min_rows: usize,
        /// Aggregate only if distinct keys < rows * ratio
        pub distinct_ratio: f64,
        /// Categories kept after aggregation
        pub aggregation_top_n: usize,
        /// Hard cap on plotted rows
        pub max_points: usize,
    }

    impl Default for ChartSettings {
        fn default() -> Self {
            Self {
                aggregation_min_rows: 20,
                distinct_ratio: 0.8,
                aggregation_top_n: 20,
                max_points: 1000,
            }
        }
    }

    /// Open-data catalog connection
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CatalogSettings {
        pub domain: String, // e.g., "www.datos.gov.co"
        pub app_token: Option<String>,
        /// Rows requested when the agent does not pass a limit
        pub fetch_limit: usize,
    }

    impl Default for CatalogSettings {
        fn default() -> Self {
            Self {
                domain: "www.datos.gov.co".into(),
                app_token: None,
                fetch_limit: 10_000,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct AnalysisSettings {
        #[serde(default = "default_max_datasets")]
        pub max_datasets: usize,
        #[serde(default = "default_top_n")]
        pub frequency_top_n: usize,
        #[serde(default = "default_query_limit")]
        pub default_query_limit: usize,
        /// Label used for null cells in frequency tables
        #[serde(default = "default_null_label")]
        pub null_label: String,
        /// Written by `fill_value` when the agent gives no value
        #[serde(default = "default_fill_value")]
        pub default_fill_value: String,
        #[serde(default)]
        pub chart: ChartSettings,
        #[serde(default)]
        pub catalog: CatalogSettings,
    }

    impl Default for AnalysisSettings {
        fn default() -> Self {
            Self {
                max_datasets: default_max_datasets(),
                frequency_top_n: default_top_n(),
                default_query_limit: default_query_limit(),
                null_label: default_null_label(),
                default_fill_value: default_fill_value(),
                chart: ChartSettings::default(),
                catalog: CatalogSettings::default(),
            }
        }
    }

    impl AnalysisSettings {
        /// `<config dir>/analy/settings.json`
        pub fn config_path() -> Option<PathBuf> {
            directories::ProjectDirs::from("com.local", "Analy", "analy")
                .map(|proj| proj.config_dir().join("settings.json"))
        }

        /// Load settings from disk or return defaults, then apply env overrides
        pub fn load() -> Self {
            let mut settings = Self::config_path()
                .and_then(|path| std::fs::read_to_string(path).ok())
                .and_then(|contents| match serde_json::from_str::<Self>(&contents) {
                    Ok(settings) => Some(settings),
                    Err(err) => {
                        tracing::warn!(%err, "ignoring unreadable settings file");
                        None
                    }
                })
                .unwrap_or_default();
            settings.apply_env();
            settings
        }

        /// `ANALY_MAX_DATASETS` and `ANALY_CATALOG_TOKEN` win over the file
        pub fn apply_env(&mut self) {
            if let Some(max) = std::env::var("ANALY_MAX_DATASETS")
                .ok()
                .and_then(|v| v.parse().ok())
            {
                self.max_datasets = max;
            }
            if let Ok(token) = std::env::var("ANALY_CATALOG_TOKEN") {
                if !token.trim().is_empty() {
                    self.catalog.app_token = Some(token);
                }
            }
        }
    }

}
