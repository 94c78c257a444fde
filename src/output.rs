//! Rendering of run summaries for the terminal

use crate::discover::defang;
use crate::pipeline::{Gate, RunStatus, RunSummary};
use serde_json::{Value, json};

/// Combined structured and human-readable representation of a run
#[derive(Debug, Clone)]
pub struct RenderedSummary {
    /// Structured JSON representation suitable for downstream tooling
    pub json: Value,
    /// Human-readable lines for terminal presentation
    pub human: Vec<String>,
}

/// Render a run summary into both JSON and human-readable forms.
///
/// URLs are de-fanged in the human form only; the JSON keeps them verbatim.
pub fn render_summary(summary: &RunSummary) -> RenderedSummary {
    RenderedSummary {
        json: summary_value(summary),
        human: human_lines(summary),
    }
}

fn summary_value(summary: &RunSummary) -> Value {
    let mut value = serde_json::to_value(summary).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "flagged".to_string(),
            json!(
                summary
                    .analyses
                    .iter()
                    .filter(|record| record.score.malicious > 0)
                    .count()
            ),
        );
    }
    value
}

fn human_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!("Run status: {}", status_label(summary.status)));
    lines.push(format!("  Images: {}", summary.inputs.len()));
    lines.push(format!("  URLs discovered: {}", summary.urls.len()));
    for url in &summary.urls {
        lines.push(format!("    {}", defang(url)));
    }

    if !summary.analyses.is_empty() {
        lines.push("  Reputation:".to_string());
        for record in &summary.analyses {
            lines.push(format!(
                "    {}  {}",
                record.score,
                defang(&record.source_url)
            ));
        }
    }

    if !summary.evidence.is_empty() {
        lines.push("  Screenshots:".to_string());
        for record in &summary.evidence {
            lines.push(format!("    {}", record.screenshot_path.display()));
        }
    }

    if let Some(document) = &summary.document {
        lines.push(format!("  Report: {}", document.display()));
    }

    lines
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "completed",
        RunStatus::NoAnalysis => "no analysis data received",
        RunStatus::Declined(Gate::Submission) => "declined before submission",
        RunStatus::Declined(Gate::Assembly) => "declined before report assembly",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::{AnalysisRecord, Score};
    use std::path::PathBuf;

    fn summary() -> RunSummary {
        RunSummary {
            status: RunStatus::Declined(Gate::Assembly),
            inputs: vec![PathBuf::from("flyer.png")],
            urls: vec!["http://evil.test".into(), "https://fine.test".into()],
            analyses: vec![
                AnalysisRecord {
                    url_id: "id-evil".into(),
                    source_url: "http://evil.test/".into(),
                    score: Score { malicious: 7, total: 90 },
                },
                AnalysisRecord {
                    url_id: "id-fine".into(),
                    source_url: "https://fine.test/".into(),
                    score: Score { malicious: 0, total: 90 },
                },
            ],
            evidence: Vec::new(),
            document: None,
        }
    }

    #[test]
    fn human_output_is_defanged() {
        let rendered = render_summary(&summary());
        assert_eq!(rendered.human[0], "Run status: declined before report assembly");
        assert!(rendered.human.iter().any(|l| l.contains("http[:]//evil[.]test")));
        assert!(rendered.human.iter().all(|l| !l.contains("http://evil.test")));
        assert!(rendered.human.iter().any(|l| l.contains("7/90")));
    }

    #[test]
    fn json_output_keeps_urls_and_counts_flags() {
        let rendered = render_summary(&summary());
        assert_eq!(rendered.json["status"], "declined");
        assert_eq!(rendered.json["gate"], "assembly");
        assert_eq!(rendered.json["urls"][0], "http://evil.test");
        assert_eq!(rendered.json["flagged"], 1);
        assert_eq!(rendered.json["analyses"][0]["score"]["total"], 90);
    }
}
