// src/pipeline/fakes.rs
//
// In-memory stand-ins for every external service, with enough recording to
// assert on what a run did.

use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use url::Url;

use super::Collaborators;
use crate::config::TableRef;
use crate::error::{PipelineError, Result};
use crate::extract::{RawTableGrid, Region, TableExtractor};
use crate::fetch::SourceFetcher;
use crate::normalize::NormalizedRecord;
use crate::secrets::{Credentials, SecretRef, SecretStore};
use crate::store::MemoryBlobStore;
use crate::warehouse::Warehouse;

pub const PDF_BYTES: &[u8] = b"%PDF-1.7 fake report";
const PDF_URL: &str = "https://cdn.virtualoz.com.au/uploads/daily_report.pdf";

/// Header as the extractor leaves it, with section titles after the `\r`.
pub fn sample_grid(rows: usize) -> RawTableGrid {
    RawTableGrid {
        header: vec![
            "".to_string(),
            "Top 30 Programs\rPage A".to_string(),
            "Ignored\rNetwork Title".to_string(),
            "Reach".to_string(),
            "Average Audience".to_string(),
            "BVOD".to_string(),
        ],
        rows: (0..rows)
            .map(|i| {
                vec![
                    i.to_string(),
                    format!("Program {}", i),
                    "Seven".to_string(),
                    format!("{}", 2_000_000 - i * 1000),
                    format!("{}", 900_000 - i * 500),
                    format!("{}", 80_000 - i * 10),
                ]
            })
            .collect(),
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    missing_link: Mutex<bool>,
    requested: Mutex<Option<Url>>,
}

impl FakeFetcher {
    pub fn no_link(&self) {
        *self.missing_link.lock().unwrap() = true;
    }

    pub fn requested(&self) -> Option<Url> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn locate_pdf_url(&self, page_url: &Url) -> Result<Url> {
        *self.requested.lock().unwrap() = Some(page_url.clone());
        if *self.missing_link.lock().unwrap() {
            return Err(PipelineError::NotFound(page_url.to_string()));
        }
        Ok(Url::parse(PDF_URL).unwrap())
    }

    async fn fetch_bytes(&self, _url: &Url) -> Result<Vec<u8>> {
        Ok(PDF_BYTES.to_vec())
    }
}

#[derive(Default)]
pub struct FakeExtractor {
    tables: Mutex<HashMap<u32, Vec<RawTableGrid>>>,
    failing: Mutex<HashSet<u32>>,
    seen: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    pub fn set(&self, page: u32, tables: Vec<RawTableGrid>) {
        self.tables.lock().unwrap().insert(page, tables);
    }

    pub fn fail(&self, page: u32) {
        self.failing.lock().unwrap().insert(page);
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TableExtractor for FakeExtractor {
    async fn extract_tables(
        &self,
        pdf_path: &Path,
        page: u32,
        _region: Region,
    ) -> Result<Vec<RawTableGrid>> {
        // the file must have been materialized before extraction
        assert_eq!(std::fs::read(pdf_path).unwrap(), PDF_BYTES);
        self.seen.lock().unwrap().push(pdf_path.to_path_buf());

        if self.failing.lock().unwrap().contains(&page) {
            return Err(PipelineError::Extraction {
                page,
                reason: "tabula returned no tables".to_string(),
            });
        }
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeSecrets {
    denied: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl FakeSecrets {
    pub fn deny(&self) {
        *self.denied.lock().unwrap() = true;
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_name(&self) -> Option<String> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SecretStore for FakeSecrets {
    async fn load_credentials(&self, secret: &SecretRef) -> Result<Credentials> {
        self.calls.lock().unwrap().push(secret.name());
        if *self.denied.lock().unwrap() {
            return Err(PipelineError::SecretAccess {
                name: secret.name(),
                reason: "permission denied".to_string(),
            });
        }
        Ok(Credentials::from_service_account_json(
            r#"{"type":"service_account","client_email":"loader@test","private_key":"k"}"#,
        )
        .unwrap())
    }
}

#[derive(Default)]
pub struct FakeWarehouse {
    loads: Mutex<Vec<(String, Vec<NormalizedRecord>)>>,
    rejected: Mutex<HashSet<String>>,
}

impl FakeWarehouse {
    /// Fail loads into any table named `table`.
    pub fn reject(&self, table: &str) {
        self.rejected.lock().unwrap().insert(table.to_string());
    }

    pub fn loads(&self) -> Vec<(String, Vec<NormalizedRecord>)> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn append_rows(
        &self,
        records: &[NormalizedRecord],
        table: &TableRef,
        _credentials: &Credentials,
    ) -> Result<()> {
        if self.rejected.lock().unwrap().contains(&table.table) {
            return Err(PipelineError::Load {
                table: table.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.loads
            .lock()
            .unwrap()
            .push((table.to_string(), records.to_vec()));
        Ok(())
    }
}

/// Every fake, shared with the pipeline under test.
pub struct Harness {
    pub fetcher: Arc<FakeFetcher>,
    pub store: MemoryBlobStore,
    pub extractor: Arc<FakeExtractor>,
    pub secrets: Arc<FakeSecrets>,
    pub warehouse: Arc<FakeWarehouse>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(FakeFetcher::default()),
            store: MemoryBlobStore::new(),
            extractor: Arc::new(FakeExtractor::default()),
            secrets: Arc::new(FakeSecrets::default()),
            warehouse: Arc::new(FakeWarehouse::default()),
        }
    }

    pub fn services(&self) -> Collaborators {
        Collaborators {
            fetcher: self.fetcher.clone(),
            store: Arc::new(self.store.clone()),
            extractor: self.extractor.clone(),
            secrets: self.secrets.clone(),
            warehouse: self.warehouse.clone(),
        }
    }
}
