// src/normalize/mod.rs

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::extract::RawTableGrid;
use crate::report_date::ReportDate;

/// Extracted tables carry a leading index column ahead of the data columns.
const INDEX_COLUMNS: usize = 1;

/// Output column names, positional over the extracted data columns.
pub const DATA_COLUMNS: [&str; 5] = [
    "Description",
    "Network",
    "Total TV National Reach",
    "Total TV National Average Audience",
    "BVOD National Average Audience",
];

/// Rows ranked at or past this are footers or beyond the top list.
pub const RANK_CUTOFF: u32 = 30;

/// One row of a destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "Total TV National Reach")]
    pub total_tv_national_reach: String,
    #[serde(rename = "Total TV National Average Audience")]
    pub total_tv_national_average_audience: String,
    #[serde(rename = "BVOD National Average Audience")]
    pub bvod_national_average_audience: String,
    #[serde(rename = "Date")]
    pub date: String,
}

/// Turn one extracted grid into ranked, dated records.
///
/// - the index column is dropped and the rest are taken positionally
/// - the first row's `Description`/`Network` are replaced with the second
///   `\r` segment of the matching header cell, where the extractor leaves the
///   section title
/// - rank is the 1-based row position; ranks from [`RANK_CUTOFF`] on are cut
pub fn normalize(grid: &RawTableGrid, date: ReportDate) -> Result<Vec<NormalizedRecord>> {
    let width = INDEX_COLUMNS + DATA_COLUMNS.len();
    if grid.header.len() != width {
        return Err(PipelineError::MalformedTable(format!(
            "expected {} columns, found {}",
            width,
            grid.header.len()
        )));
    }
    if grid.rows.is_empty() {
        return Err(PipelineError::MalformedTable("no data rows".to_string()));
    }

    let header = &grid.header[INDEX_COLUMNS..];
    let title_description = header_title(header, 0)?;
    let title_network = header_title(header, 1)?;
    let iso = date.iso();

    let mut records = Vec::with_capacity(grid.rows.len().min(RANK_CUTOFF as usize - 1));
    for (idx, row) in grid.rows.iter().enumerate() {
        // footer rows past the cutoff may be ragged
        let rank = idx as u32 + 1;
        if rank >= RANK_CUTOFF {
            break;
        }

        if row.len() != width {
            return Err(PipelineError::MalformedTable(format!(
                "row {} has {} cells, expected {}",
                idx,
                row.len(),
                width
            )));
        }

        let cells = &row[INDEX_COLUMNS..];
        let (description, network) = if idx == 0 {
            (title_description.to_string(), title_network.to_string())
        } else {
            (cells[0].clone(), cells[1].clone())
        };

        records.push(NormalizedRecord {
            rank,
            description,
            network,
            total_tv_national_reach: cells[2].clone(),
            total_tv_national_average_audience: cells[3].clone(),
            bvod_national_average_audience: cells[4].clone(),
            date: iso.clone(),
        });
    }

    Ok(records)
}

/// Second half of a `"<label>\r<title>"` header cell.
fn header_title(header: &[String], column: usize) -> Result<&str> {
    let value = &header[column];
    let mut parts = value.split('\r');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(title), None) => Ok(title),
        _ => Err(PipelineError::MalformedHeader {
            column,
            value: value.clone(),
        }),
    }
}
