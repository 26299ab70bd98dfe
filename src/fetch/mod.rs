// src/fetch/mod.rs

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::error::{PipelineError, Result};
use crate::report_date::ReportDate;

/// The report site rejects requests without a browser-like agent.
pub const USER_AGENT: &str = "Mozilla/5.0";

static PDF_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href$=".pdf"]"#).expect("PDF link selector should parse"));

/// A downloaded report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfAsset {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Everything the pipeline needs from the report website.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// First `.pdf` link on `page_url`, in document order.
    async fn locate_pdf_url(&self, page_url: &Url) -> Result<Url>;

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>>;

    /// Locate the PDF on `page_url` and download it.
    async fn download(&self, page_url: &Url) -> Result<PdfAsset> {
        let pdf_url = self.locate_pdf_url(page_url).await?;
        info!(url = %pdf_url, "found report PDF");
        let bytes = self.fetch_bytes(&pdf_url).await?;
        Ok(PdfAsset {
            filename: pdf_filename(&pdf_url),
            bytes,
        })
    }
}

/// Daily report page for `date`, e.g. `...top-30-programs/?date=2024-03-13`.
pub fn report_page_url(base: &str, date: ReportDate) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| PipelineError::Config(format!("invalid report base URL {}: {}", base, e)))?;
    url.query_pairs_mut().clear().append_pair("date", &date.iso());
    Ok(url)
}

/// Scan anchors in document order for the first href ending in `.pdf`.
/// Relative hrefs are resolved against `base`.
pub fn find_pdf_link(html: &str, base: &Url) -> Option<Url> {
    Html::parse_document(html)
        .select(&PDF_LINK)
        .filter_map(|e| e.value().attr("href"))
        .find_map(|href| base.join(href).ok())
}

/// Last path segment of the PDF's URL, percent-decoded.
pub fn pdf_filename(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or("report.pdf");
    urlencoding::decode(segment)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Live implementation over `reqwest`.
pub struct HttpSourceFetcher {
    client: Client,
}

impl HttpSourceFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        let resp = self.client.get(url.as_str()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn locate_pdf_url(&self, page_url: &Url) -> Result<Url> {
        let html = self.get(page_url).await?.text().await?;
        debug!(bytes = html.len(), url = %page_url, "fetched report page");
        find_pdf_link(&html, page_url).ok_or_else(|| PipelineError::NotFound(page_url.to_string()))
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let bytes = self.get(url).await?.bytes().await?;
        debug!(bytes = bytes.len(), url = %url, "downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn page() -> Url {
        Url::parse("https://virtualoz.com.au/report/total-tv-overnight-top-30-programs/?date=2024-03-13")
            .unwrap()
    }

    #[test]
    fn test_report_page_url() {
        let date = ReportDate::for_run(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let url = report_page_url(
            "https://virtualoz.com.au/report/total-tv-overnight-top-30-programs/",
            date,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://virtualoz.com.au/report/total-tv-overnight-top-30-programs/?date=2024-03-13"
        );
    }

    #[test]
    fn test_first_pdf_link_wins() {
        let html = r#"
            <html><body>
              <a href="/about">About</a>
              <a>no href</a>
              <a href="https://cdn.example.com/files/report_20240313.pdf">Download</a>
              <a href="https://cdn.example.com/files/other.pdf">Other</a>
            </body></html>"#;
        let url = find_pdf_link(html, &page()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/files/report_20240313.pdf");
        assert_eq!(pdf_filename(&url), "report_20240313.pdf");
    }

    #[test]
    fn test_relative_link_is_resolved() {
        let html = r#"<a href="/wp-content/uploads/daily.pdf">pdf</a>"#;
        let url = find_pdf_link(html, &page()).unwrap();
        assert_eq!(url.as_str(), "https://virtualoz.com.au/wp-content/uploads/daily.pdf");
    }

    #[test]
    fn test_filename_is_decoded() {
        let html = r#"<a href="/uploads/Daily Report 13-03.pdf">pdf</a>"#;
        let url = find_pdf_link(html, &page()).unwrap();
        assert_eq!(url.path(), "/uploads/Daily%20Report%2013-03.pdf");
        assert_eq!(pdf_filename(&url), "Daily Report 13-03.pdf");
    }

    #[test]
    fn test_no_pdf_link() {
        let html = r#"<a href="/report.pdf.html">nope</a><a href="/x.PDFX">nope</a>"#;
        assert!(find_pdf_link(html, &page()).is_none());
    }
}
