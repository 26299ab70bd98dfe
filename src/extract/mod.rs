// src/extract/mod.rs

pub mod tabula;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

pub use tabula::TabulaCliExtractor;

/// Page area that holds the top-30 table, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

/// Shared by both report sections.
pub const REPORT_REGION: Region = Region {
    top: 50.0,
    left: 50.0,
    bottom: 700.0,
    right: 800.0,
};

/// One extracted table. `header` is the first row the extractor returned;
/// `rows` are the rest, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTableGrid {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTableGrid {
    /// Split extracted rows into header + data. `None` when there are no rows.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let header = rows.remove(0);
        Some(Self { header, rows })
    }
}

/// Pulls ruled tables out of one page of a PDF on disk.
///
/// Cells are delimited by the visible grid lines; implementations do not
/// fall back to whitespace heuristics.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    /// Tables found inside `region` on `page` (1-based). An empty page is an
    /// `Extraction` error, never an empty list.
    async fn extract_tables(
        &self,
        pdf_path: &Path,
        page: u32,
        region: Region,
    ) -> Result<Vec<RawTableGrid>>;
}
