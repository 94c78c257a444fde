//! qrtrace - QR code URL reputation evidence reports
//!
//! Given photos or scans of suspicious QR codes (phishing flyers, parking
//! meter stickers), qrtrace decodes every code, pulls out each URL they point
//! to, asks VirusTotal how many engines flag each one, screenshots the report
//! pages, and binds the screenshots into a single `.docx` an analyst can share.
//!
//! # Pipeline
//!
//! ```text
//! images ─ qr ─▶ payloads ─ discover ─▶ URL set ─ reputation ─▶ analyses
//!        ─ evidence (browser) ─▶ screenshots ─ report ─▶ RCA_<timestamp>.docx
//! ```
//!
//! # Example
//!
//! ```no_run
//! use qrtrace::{AssumeYes, Pipeline, QrTraceConfig, WebDriverLauncher};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> qrtrace::Result<()> {
//!     let config = QrTraceConfig::load(None)?;
//!     let mut pipeline = Pipeline::new(config, AssumeYes, WebDriverLauncher);
//!     let summary = pipeline.run(&[PathBuf::from("flyer.png")]).await?;
//!     println!("report: {:?}", summary.document);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod browser;
pub mod config;
pub mod confirm;
pub mod discover;
pub mod error;
pub mod evidence;
pub mod input;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod qr;
pub mod report;
pub mod reputation;

// Re-exports for convenience
pub use error::{Error, Result};

pub use browser::{Browser, BrowserLauncher, WebDriver, WebDriverLauncher};
pub use config::{
    BrowserOptions, LogRotation, LoggingOptions, OutputOptions, QrTraceConfig, ReputationOptions,
};
pub use confirm::{AssumeYes, Confirm, TerminalPrompt};
pub use discover::{UrlDiscoverer, UrlSet, defang};
pub use evidence::{EvidenceCapture, EvidenceRecord};
pub use pipeline::{Gate, Pipeline, RunStatus, RunSummary};
pub use qr::{QrDecoder, QrPayload};
pub use report::{Document, ReportAssembler};
pub use reputation::{AnalysisRecord, ReputationClient, Score};
