// src/pipeline/mod.rs

#[cfg(test)]
mod fakes;

use std::{fmt, path::PathBuf, sync::Arc};
use tempfile::TempPath;
use tracing::{error, info, instrument};

use crate::config::{Config, Section, TableRef};
use crate::error::{PipelineError, Result};
use crate::extract::{TableExtractor, TabulaCliExtractor, REPORT_REGION};
use crate::fetch::{report_page_url, HttpSourceFetcher, SourceFetcher};
use crate::normalize::normalize;
use crate::report_date::ReportDate;
use crate::secrets::{SecretManagerStore, SecretRef, SecretStore};
use crate::store::{input_key, BlobStore, GcsBlobStore, PDF_CONTENT_TYPE};
use crate::warehouse::{BigQueryWarehouse, Warehouse};

pub const SUCCESS_MESSAGE: &str = "Pipeline finished successfully!";

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Init,
    Fetching,
    Extracting { page: u32 },
    Normalizing { page: u32 },
    Loading { table: TableRef },
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Init => f.write_str("init"),
            Stage::Fetching => f.write_str("fetching"),
            Stage::Extracting { page } => write!(f, "extracting page {}", page),
            Stage::Normalizing { page } => write!(f, "normalizing page {}", page),
            Stage::Loading { table } => write!(f, "loading {}", table),
            Stage::Done => f.write_str("done"),
        }
    }
}

/// A run that stopped early. Tables loaded before `stage` keep their rows.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: PipelineError,
    pub loaded: Vec<LoadedSection>,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSection {
    pub page: u32,
    pub table: TableRef,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub report_date: ReportDate,
    pub pdf_filename: String,
    pub sections: Vec<LoadedSection>,
}

/// `(message, status)` returned to whoever triggered the run.
pub fn response(result: &std::result::Result<RunSummary, PipelineFailure>) -> (String, u16) {
    match result {
        Ok(_) => (SUCCESS_MESSAGE.to_string(), 200),
        Err(failure) => (format!("Pipeline failed: {}", failure), 500),
    }
}

/// External services a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub store: Arc<dyn BlobStore>,
    pub extractor: Arc<dyn TableExtractor>,
    pub secrets: Arc<dyn SecretStore>,
    pub warehouse: Arc<dyn Warehouse>,
}

impl Collaborators {
    /// Real services: the report site, GCS, tabula, Secret Manager, BigQuery.
    pub async fn live(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: Arc::new(HttpSourceFetcher::new()?),
            store: Arc::new(GcsBlobStore::new().await?),
            extractor: Arc::new(TabulaCliExtractor::new(
                &config.java_bin,
                &config.tabula_jar,
            )),
            secrets: Arc::new(SecretManagerStore::new()?),
            warehouse: Arc::new(BigQueryWarehouse::new(&config.project_id)),
        })
    }
}

/// Download → store → (extract → normalize → load) per section, once.
pub struct Pipeline {
    config: Config,
    services: Collaborators,
}

/// Tracks the current stage so a failure can say where it happened.
struct Run {
    stage: Stage,
    loaded: Vec<LoadedSection>,
}

impl Run {
    fn enter(&mut self, stage: Stage) {
        info!(stage = %stage, "entering stage");
        self.stage = stage;
    }

    fn fail(self, error: PipelineError) -> PipelineFailure {
        error!(stage = %self.stage, "Pipeline execution failed: {}", error);
        PipelineFailure {
            stage: self.stage,
            error,
            loaded: self.loaded,
        }
    }
}

macro_rules! step {
    ($run:expr, $e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Err($run.fail(e)),
        }
    };
}

impl Pipeline {
    pub fn new(config: Config, services: Collaborators) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run for today's report.
    pub async fn run(&self) -> std::result::Result<RunSummary, PipelineFailure> {
        self.run_for(ReportDate::today()).await
    }

    #[instrument(skip_all, fields(date = %date))]
    pub async fn run_for(
        &self,
        date: ReportDate,
    ) -> std::result::Result<RunSummary, PipelineFailure> {
        let mut run = Run {
            stage: Stage::Init,
            loaded: Vec::new(),
        };
        info!("Starting pipeline for date: {}", date);
        let page_url = step!(run, report_page_url(&self.config.report_base_url, date));

        run.enter(Stage::Fetching);
        let (pdf_filename, local_pdf) = step!(run, self.fetch_report(&page_url, date).await);

        for section in self.config.sections() {
            let result = self.run_section(&mut run, &section, &local_pdf, date).await;
            let rows = step!(run, result);
            run.loaded.push(LoadedSection {
                page: section.page,
                table: section.destination.clone(),
                rows,
            });
        }

        run.enter(Stage::Done);
        drop(local_pdf);
        let summary = RunSummary {
            report_date: date,
            pdf_filename,
            sections: run.loaded,
        };
        info!(?summary, "{}", SUCCESS_MESSAGE);
        Ok(summary)
    }

    /// Download the PDF, keep a copy in the bucket, then pull that copy to a
    /// local file that is removed when the returned path is dropped.
    async fn fetch_report(
        &self,
        page_url: &url::Url,
        date: ReportDate,
    ) -> Result<(String, TempPath)> {
        let asset = self.services.fetcher.download(page_url).await?;
        let key = input_key(&asset.filename);
        let bucket = &self.config.gcs_bucket;
        self.services
            .store
            .put(bucket, &key, asset.bytes, PDF_CONTENT_TYPE)
            .await?;
        info!("Downloaded and uploaded to GCS: gs://{}/{}", bucket, key);

        let local = TempPath::from_path(self.local_pdf_path(date));
        self.services
            .store
            .get_to_local_path(bucket, &key, &local)
            .await?;
        Ok((asset.filename, local))
    }

    fn local_pdf_path(&self, date: ReportDate) -> PathBuf {
        self.config
            .tmp_dir
            .join(format!("daily_overnight_programs_reach_{}.pdf", date.compact()))
    }

    /// Extract, clean and append one page's table. Returns rows loaded.
    async fn run_section(
        &self,
        run: &mut Run,
        section: &Section,
        pdf: &TempPath,
        date: ReportDate,
    ) -> Result<usize> {
        run.enter(Stage::Extracting { page: section.page });
        let tables = self
            .services
            .extractor
            .extract_tables(pdf, section.page, REPORT_REGION)
            .await?;
        let grid = tables.first().ok_or_else(|| PipelineError::Extraction {
            page: section.page,
            reason: "extractor returned an empty table list".to_string(),
        })?;

        run.enter(Stage::Normalizing { page: section.page });
        let records = normalize(grid, date)?;
        info!("Data cleaning complete. Found {} rows.", records.len());

        run.enter(Stage::Loading {
            table: section.destination.clone(),
        });
        let secret = SecretRef::latest(&self.config.project_id, &self.config.secret_id);
        let credentials = self.services.secrets.load_credentials(&secret).await?;
        self.services
            .warehouse
            .append_rows(&records, &section.destination, &credentials)
            .await?;
        info!("Successfully loaded data to {}", section.destination);

        Ok(records.len())
    }
}
