//! Screenshot evidence of each reputation report
//!
//! One browser session serves the whole batch. The first screenshot that
//! cannot be produced or written stops the batch: a report with silent gaps
//! could misrepresent the findings, so the caller gets the failing path
//! instead of partial evidence.

use crate::browser::Browser;
use crate::error::{Error, Result};
use crate::reputation::AnalysisRecord;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timestamp layout used in generated file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// A captured report page ready to be placed in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Host of the analysed URL with dots replaced by underscores
    pub heading: String,
    /// Score rendered as `flagged/total`
    pub score_text: String,
    /// Screenshot written by the capture
    pub screenshot_path: PathBuf,
    /// Report page the screenshot was taken from
    pub report_url: String,
}

/// Current local time formatted with [`FILE_TIMESTAMP_FORMAT`].
pub fn file_timestamp() -> String {
    chrono::Local::now().format(FILE_TIMESTAMP_FORMAT).to_string()
}

/// File-system safe label for the host of `source_url`.
pub fn heading_for(source_url: &str) -> String {
    let host = Url::parse(source_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .or_else(|| {
            Url::parse(&format!("http://{source_url}"))
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
        })
        .filter(|host| !host.is_empty());

    match host {
        Some(host) => host.replace('.', "_"),
        None => "unknown_host".to_string(),
    }
}

/// `dir/<stem>_<timestamp>.png`, suffixed with `_<n>` if that file exists.
fn unique_png_path(dir: &Path, stem: &str, timestamp: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}_{timestamp}.png"));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_{timestamp}_{n}.png"));
        n += 1;
    }
    candidate
}

/// Drives a browser through every report page and saves screenshots.
#[derive(Debug, Clone)]
pub struct EvidenceCapture {
    report_base_url: String,
    images_dir: PathBuf,
    settle_delay: Duration,
}

impl EvidenceCapture {
    /// `report_base_url` is prefixed verbatim to each record's identifier.
    pub fn new(
        report_base_url: impl Into<String>,
        images_dir: impl Into<PathBuf>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            report_base_url: report_base_url.into(),
            images_dir: images_dir.into(),
            settle_delay,
        }
    }

    /// Report page URL for `record`.
    pub fn report_url(&self, record: &AnalysisRecord) -> String {
        format!("{}{}", self.report_base_url, record.url_id)
    }

    /// Capture every record in order, then quit the browser.
    ///
    /// The browser is quit on the failure path too.
    pub async fn capture<B: Browser>(
        &self,
        mut browser: B,
        records: &[AnalysisRecord],
    ) -> Result<Vec<EvidenceRecord>> {
        let outcome = self.capture_all(&mut browser, records).await;

        if let Err(err) = browser.quit().await {
            tracing::warn!("Browser did not shut down cleanly: {err}");
        }

        outcome
    }

    async fn capture_all<B: Browser>(
        &self,
        browser: &mut B,
        records: &[AnalysisRecord],
    ) -> Result<Vec<EvidenceRecord>> {
        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .map_err(|e| Error::ScreenshotFailed {
                path: self.images_dir.clone(),
                reason: format!("cannot create image directory: {e}"),
            })?;

        let mut evidence = Vec::with_capacity(records.len());
        for record in records {
            let heading = heading_for(&record.source_url);
            let report_url = self.report_url(record);
            let score_text = record.score.to_string();
            tracing::info!(
                domain = %heading,
                score = %score_text,
                url = %report_url,
                "Capturing reputation report"
            );

            let path = unique_png_path(&self.images_dir, &heading, &file_timestamp());
            tracing::info!("Attempting to save the file at {}", path.display());

            if let Err(err) = self.snap(browser, &report_url, &path).await {
                tracing::error!("Error: Failed to save file.");
                return Err(Error::ScreenshotFailed {
                    path,
                    reason: err.to_string(),
                });
            }
            tracing::info!("File successfully saved");

            evidence.push(EvidenceRecord {
                heading,
                score_text,
                screenshot_path: path,
                report_url,
            });
        }

        Ok(evidence)
    }

    async fn snap<B: Browser>(&self, browser: &mut B, url: &str, path: &Path) -> Result<()> {
        browser.navigate(url).await?;
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        let png = browser.screenshot().await?;
        tokio::fs::write(path, &png).await?;
        Ok(())
    }
}
