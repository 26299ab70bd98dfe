// src/warehouse/mod.rs

use async_trait::async_trait;
use google_cloud_bigquery::{
    client::{google_cloud_auth::credentials::CredentialsFile, Client, ClientConfig},
    http::tabledata::insert_all::{InsertAllRequest, Row},
};
use tracing::{info, warn};

use crate::config::TableRef;
use crate::error::{PipelineError, Result};
use crate::normalize::NormalizedRecord;
use crate::secrets::Credentials;

/// Append-only sink for normalized records.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Append `records` to `table`. Existing rows are never touched.
    async fn append_rows(
        &self,
        records: &[NormalizedRecord],
        table: &TableRef,
        credentials: &Credentials,
    ) -> Result<()>;
}

/// BigQuery streaming inserts, one client per load.
pub struct BigQueryWarehouse {
    default_project: String,
}

impl BigQueryWarehouse {
    /// Tables without an explicit project are loaded into `default_project`.
    pub fn new(default_project: impl Into<String>) -> Self {
        Self {
            default_project: default_project.into(),
        }
    }

    fn project_for<'a>(&'a self, table: &'a TableRef) -> &'a str {
        table.project.as_deref().unwrap_or(&self.default_project)
    }

    async fn client(&self, credentials: &Credentials, table: &TableRef) -> Result<Client> {
        let load_failed = |reason: String| PipelineError::Load {
            table: table.to_string(),
            reason,
        };
        let file = CredentialsFile::new_from_str(credentials.key_json())
            .await
            .map_err(|e| load_failed(format!("reading credentials: {}", e)))?;
        let (config, _project) = ClientConfig::new_with_credentials(file)
            .await
            .map_err(|e| load_failed(format!("configuring BigQuery client: {}", e)))?;
        Client::new(config)
            .await
            .map_err(|e| load_failed(format!("connecting to BigQuery: {}", e)))
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn append_rows(
        &self,
        records: &[NormalizedRecord],
        table: &TableRef,
        credentials: &Credentials,
    ) -> Result<()> {
        if records.is_empty() {
            warn!(table = %table, "no rows to load");
            return Ok(());
        }
        let load_failed = |reason: String| PipelineError::Load {
            table: table.to_string(),
            reason,
        };

        let client = self.client(credentials, table).await?;
        let request = InsertAllRequest {
            rows: records
                .iter()
                .map(|r| Row {
                    insert_id: None,
                    json: r.clone(),
                })
                .collect(),
            ..Default::default()
        };

        let project = self.project_for(table);
        let response = client
            .tabledata()
            .insert(project, &table.dataset, &table.table, &request)
            .await
            .map_err(|e| load_failed(e.to_string()))?;

        if let Some(errors) = response.insert_errors.filter(|e| !e.is_empty()) {
            let first = errors
                .first()
                .map(|e| format!("row {}: {:?}", e.index, e.errors))
                .unwrap_or_default();
            return Err(load_failed(format!(
                "{} rows rejected, first: {}",
                errors.len(),
                first
            )));
        }

        info!(
            table = %table,
            project,
            rows = records.len(),
            account = credentials.client_email(),
            "appended rows"
        );
        Ok(())
    }
}
