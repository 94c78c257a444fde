//! End-to-end run: images in, evidence report out
//!
//! All state lives in the run itself so repeated runs in one process never
//! see each other's URLs or files.

use crate::browser::BrowserLauncher;
use crate::config::QrTraceConfig;
use crate::confirm::Confirm;
use crate::discover::UrlDiscoverer;
use crate::error::{Error, Result};
use crate::evidence::{EvidenceCapture, EvidenceRecord};
use crate::input::validate_inputs;
use crate::qr::QrDecoder;
use crate::report::ReportAssembler;
use crate::reputation::{AnalysisRecord, ReputationClient};
use serde::Serialize;
use std::path::PathBuf;

/// Prompt shown before anything leaves the machine.
pub const SUBMIT_PROMPT: &str =
    "Would you like to submit the above URLs to VirusTotal and get the reports?";
/// Prompt shown before the report document is written.
pub const ASSEMBLE_PROMPT: &str = "Would you like to assemble the captured evidence into a report?";

/// Confirmation gate at which the operator stopped the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Before URLs are sent to the reputation service
    Submission,
    /// Before the report document is written
    Assembly,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "gate")]
pub enum RunStatus {
    /// Report written
    Completed,
    /// The service returned no usable analysis, nothing to capture
    NoAnalysis,
    /// Operator declined at a gate
    Declined(Gate),
}

/// Everything a run produced, whatever stage it stopped at.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Final state of the run
    #[serde(flatten)]
    pub status: RunStatus,
    /// Images that passed validation
    pub inputs: Vec<PathBuf>,
    /// Distinct URLs discovered
    pub urls: Vec<String>,
    /// Reputation results
    pub analyses: Vec<AnalysisRecord>,
    /// Captured screenshots
    pub evidence: Vec<EvidenceRecord>,
    /// Report document, when one was written
    pub document: Option<PathBuf>,
}

impl RunSummary {
    fn new(inputs: Vec<PathBuf>, urls: Vec<String>) -> Self {
        Self {
            status: RunStatus::Completed,
            inputs,
            urls,
            analyses: Vec::new(),
            evidence: Vec::new(),
            document: None,
        }
    }

    fn finish(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }
}

/// Sequential pipeline with injectable gates and browser.
pub struct Pipeline<C, L> {
    config: QrTraceConfig,
    confirm: C,
    launcher: L,
    decoder: QrDecoder,
}

impl<C: Confirm, L: BrowserLauncher> Pipeline<C, L> {
    /// Create a pipeline; nothing is touched until [`Pipeline::run`].
    pub fn new(config: QrTraceConfig, confirm: C, launcher: L) -> Self {
        Self {
            config,
            confirm,
            launcher,
            decoder: QrDecoder::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &QrTraceConfig {
        &self.config
    }

    /// Run every stage over `inputs`.
    ///
    /// Declining a gate or receiving no analyses is a successful, early end.
    pub async fn run(&mut self, inputs: &[PathBuf]) -> Result<RunSummary> {
        let files = validate_inputs(inputs)?;
        let payloads = self.decoder.decode_batch(&files);

        let mut discoverer = UrlDiscoverer::new();
        for payload in &payloads {
            discoverer.discover(payload.as_str());
        }
        let urls = discoverer.urls().clone();
        if urls.is_empty() {
            return Err(Error::NoUrlsFound);
        }

        let mut summary = RunSummary::new(files, urls.iter().cloned().collect());

        if !self.confirm.confirm(SUBMIT_PROMPT) {
            tracing::info!("Terminating program.");
            return Ok(summary.finish(RunStatus::Declined(Gate::Submission)));
        }

        tracing::info!("Checking for the VirusTotal API key and Chrome Driver Path");
        let api_key = self.config.require_api_key()?;
        self.config.require_driver_path()?;
        tracing::info!("VirusTotal API key and Chrome Driver Path found");

        summary.analyses = {
            let client = ReputationClient::new(&self.config.reputation, api_key)?;
            client.analyze(&urls).await
        };
        if summary.analyses.is_empty() {
            tracing::info!("No analysis data received. No screenshots will be taken.");
            return Ok(summary.finish(RunStatus::NoAnalysis));
        }

        let capture = EvidenceCapture::new(
            self.config.reputation.report_base_url.clone(),
            self.config.output.images_dir.clone(),
            self.config.browser.settle_delay(),
        );
        let browser = self.launcher.launch(&self.config.browser).await?;
        summary.evidence = capture.capture(browser, &summary.analyses).await?;

        if !self.confirm.confirm(ASSEMBLE_PROMPT) {
            tracing::info!("Report not assembled; screenshots remain on disk.");
            return Ok(summary.finish(RunStatus::Declined(Gate::Assembly)));
        }

        let assembler = ReportAssembler::new(self.config.output.docs_dir.clone());
        summary.document = Some(assembler.assemble(&summary.evidence)?);
        tracing::info!("Program execution concluded.");

        Ok(summary.finish(RunStatus::Completed))
    }
}
