// src/config.rs

use crate::error::{PipelineError, Result};
use std::{env, fmt, path::PathBuf, str::FromStr};

const DEFAULT_BUCKET: &str = "cloud-ai-platform-61d1d1ac-0c20-4f68-80f0-c83968051585";
const DEFAULT_TABLE: &str = "99_temp.vizoz_datatest";
const DEFAULT_TABLE_2: &str = "99_temp.vizoz_test_results";
const DEFAULT_PROJECT_ID: &str = "121869423260";
const DEFAULT_SECRET_ID: &str = "semology-dev";
const DEFAULT_REPORT_BASE_URL: &str =
    "https://virtualoz.com.au/report/total-tv-overnight-top-30-programs/";
const DEFAULT_PORT: u16 = 8080;

/// Page holding the first top-30 table.
pub const FIRST_SECTION_PAGE: u32 = 3;
/// Page holding the second top-30 table.
pub const SECOND_SECTION_PAGE: u32 = 9;

/// A BigQuery table given as `dataset.table` or `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: Option<String>,
    pub dataset: String,
    pub table: String,
}

impl FromStr for TableRef {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(PipelineError::Config(format!("invalid table id {:?}", s)));
        }
        match parts.as_slice() {
            [dataset, table] => Ok(Self {
                project: None,
                dataset: dataset.to_string(),
                table: table.to_string(),
            }),
            [project, dataset, table] => Ok(Self {
                project: Some(project.to_string()),
                dataset: dataset.to_string(),
                table: table.to_string(),
            }),
            _ => Err(PipelineError::Config(format!(
                "table id {:?} must be dataset.table or project.dataset.table",
                s
            ))),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project {
            Some(p) => write!(f, "{}.{}.{}", p, self.dataset, self.table),
            None => write!(f, "{}.{}", self.dataset, self.table),
        }
    }
}

/// One page of the report and the table its rows are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub page: u32,
    pub destination: TableRef,
}

/// Process-wide settings, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub gcs_bucket: String,
    pub destination_table: TableRef,
    pub destination_table_2: TableRef,
    pub project_id: String,
    pub secret_id: String,
    pub report_base_url: String,
    pub tabula_jar: PathBuf,
    pub java_bin: PathBuf,
    pub tmp_dir: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| PipelineError::Config(format!("invalid PORT {:?}", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            gcs_bucket: get("GCS_BUCKET_NAME", DEFAULT_BUCKET),
            destination_table: get("BQ_DESTINATION_TABLE", DEFAULT_TABLE).parse()?,
            destination_table_2: get("BQ_DESTINATION_TABLE_2", DEFAULT_TABLE_2).parse()?,
            project_id: get("GCP_PROJECT_ID", DEFAULT_PROJECT_ID),
            secret_id: get("SECRET_ID", DEFAULT_SECRET_ID),
            report_base_url: get("REPORT_BASE_URL", DEFAULT_REPORT_BASE_URL),
            tabula_jar: PathBuf::from(get("TABULA_JAR", "tabula.jar")),
            java_bin: PathBuf::from(get("JAVA_BIN", "java")),
            tmp_dir: lookup("TMPDIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            port,
        })
    }

    /// The two report sections, in the order they are loaded.
    pub fn sections(&self) -> Vec<Section> {
        vec![
            Section {
                page: FIRST_SECTION_PAGE,
                destination: self.destination_table.clone(),
            },
            Section {
                page: SECOND_SECTION_PAGE,
                destination: self.destination_table_2.clone(),
            },
        ]
    }
}
