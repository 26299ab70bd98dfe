// src/extract/tabula.rs

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use super::{RawTableGrid, Region, TableExtractor};
use crate::error::{PipelineError, Result};

/// Table set printed by `tabula-java --format JSON`.
#[derive(Deserialize, Debug)]
#[serde(transparent)]
pub struct JsonTableSet(pub Vec<JsonTable>);

#[derive(Deserialize, Debug)]
pub struct JsonTable {
    #[serde(default)]
    pub extraction_method: String,
    #[serde(default)]
    pub page_number: i32,
    pub data: Vec<Vec<JsonCell>>,
}

#[derive(Deserialize, Debug)]
pub struct JsonCell {
    #[serde(default)]
    pub text: String,
}

impl JsonTableSet {
    /// Non-empty tables as grids; the first row of each becomes its header.
    pub fn into_grids(self) -> Vec<RawTableGrid> {
        self.0
            .into_iter()
            .filter_map(|table| {
                let rows = table
                    .data
                    .into_iter()
                    .map(|row| row.into_iter().map(|cell| cell.text).collect())
                    .collect();
                RawTableGrid::from_rows(rows)
            })
            .collect()
    }
}

/// Runs the tabula-java jar in lattice mode and decodes its JSON output.
pub struct TabulaCliExtractor {
    java_bin: PathBuf,
    jar: PathBuf,
}

impl TabulaCliExtractor {
    pub fn new(java_bin: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java_bin: java_bin.into(),
            jar: jar.into(),
        }
    }

    fn args(&self, pdf_path: &Path, page: u32, region: Region) -> Vec<String> {
        vec![
            "-jar".to_string(),
            self.jar.display().to_string(),
            "--lattice".to_string(),
            "--pages".to_string(),
            page.to_string(),
            "--area".to_string(),
            format!(
                "{},{},{},{}",
                region.top, region.left, region.bottom, region.right
            ),
            "--format".to_string(),
            "JSON".to_string(),
            pdf_path.display().to_string(),
        ]
    }
}

#[async_trait]
impl TableExtractor for TabulaCliExtractor {
    async fn extract_tables(
        &self,
        pdf_path: &Path,
        page: u32,
        region: Region,
    ) -> Result<Vec<RawTableGrid>> {
        let extraction_failed = |reason: String| PipelineError::Extraction { page, reason };

        let args = self.args(pdf_path, page, region);
        debug!(java = %self.java_bin.display(), ?args, "running tabula");
        let output = Command::new(&self.java_bin)
            .args(&args)
            .output()
            .await
            .map_err(|e| extraction_failed(format!("spawning {}: {}", self.java_bin.display(), e)))?;

        if !output.status.success() {
            return Err(extraction_failed(format!(
                "tabula exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let set: JsonTableSet = serde_json::from_slice(&output.stdout)
            .map_err(|e| extraction_failed(format!("decoding tabula output: {}", e)))?;
        let grids = set.into_grids();
        if grids.is_empty() {
            return Err(extraction_failed("tabula returned no tables".to_string()));
        }

        info!(page, tables = grids.len(), "extracted tables");
        Ok(grids)
    }
}
