//! Reputation service client (VirusTotal v3 URL analyses)
//!
//! Lookups run in two sequential phases. Submission posts every URL and
//! collects analysis ids; retrieval fetches each analysis and normalizes the
//! verdict counts into a [`Score`]. A failure on one URL or one id is logged
//! and skipped so the rest of the batch still produces records.

use crate::config::ReputationOptions;
use crate::discover::UrlSet;
use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized verdict: flagged engines over all engines that answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// malicious + suspicious
    pub malicious: u64,
    /// malicious + suspicious + undetected + harmless
    pub total: u64,
}

impl Score {
    /// Fold the four category counts into a score.
    ///
    /// `None` when the counts do not fit in a `u64` sum.
    pub fn from_stats(stats: &AnalysisStats) -> Option<Self> {
        let malicious = stats.malicious.checked_add(stats.suspicious)?;
        let total = malicious
            .checked_add(stats.undetected)?
            .checked_add(stats.harmless)?;
        Some(Self { malicious, total })
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.malicious, self.total)
    }
}

/// Result of one URL's round trip through the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Canonical identifier of the analysed URL
    pub url_id: String,
    /// URL as echoed back by the service
    pub source_url: String,
    /// Normalized verdict
    pub score: Score,
}

/// Per-category engine counts reported for an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisStats {
    /// Engines flagging the URL as malicious
    pub malicious: u64,
    /// Engines flagging the URL as suspicious
    pub suspicious: u64,
    /// Engines without a verdict
    pub undetected: u64,
    /// Engines reporting the URL clean
    pub harmless: u64,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    data: SubmissionData,
}

#[derive(Debug, Deserialize)]
struct SubmissionData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    meta: AnalysisMeta,
    data: AnalysisData,
}

#[derive(Debug, Deserialize)]
struct AnalysisMeta {
    url_info: UrlInfo,
}

#[derive(Debug, Deserialize)]
struct UrlInfo {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisData {
    attributes: AnalysisAttributes,
}

#[derive(Debug, Deserialize)]
struct AnalysisAttributes {
    stats: AnalysisStats,
}

impl TryFrom<AnalysisResponse> for AnalysisRecord {
    type Error = Error;

    fn try_from(response: AnalysisResponse) -> Result<Self> {
        let score = Score::from_stats(&response.data.attributes.stats)
            .ok_or_else(|| Error::Reputation("stat counts overflow".into()))?;
        Ok(Self {
            url_id: response.meta.url_info.id,
            source_url: response.meta.url_info.url,
            score,
        })
    }
}

/// HTTP session against the reputation service.
pub struct ReputationClient {
    http: reqwest::Client,
    urls_endpoint: String,
    analyses_endpoint: String,
}

impl ReputationClient {
    /// Build a client that authenticates every request with `api_key`.
    pub fn new(options: &ReputationOptions, api_key: &str) -> Result<Self> {
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| Error::Config(format!("API key is not a valid header value: {e}")))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-apikey", key);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = options.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            urls_endpoint: options.urls_endpoint.clone(),
            analyses_endpoint: options.analyses_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Submit every URL, then fetch every analysis that was accepted.
    pub async fn analyze(&self, urls: &UrlSet) -> Vec<AnalysisRecord> {
        let ids = self.submit_all(urls).await;
        if ids.is_empty() {
            tracing::error!("No URL was accepted by the reputation service");
            return Vec::new();
        }
        self.fetch_all(&ids).await
    }

    /// Submission phase. Returns the analysis ids in submission order.
    pub async fn submit_all(&self, urls: &UrlSet) -> Vec<String> {
        let mut ids = Vec::with_capacity(urls.len());
        for url in urls {
            match self.submit(url).await {
                Ok(id) => {
                    tracing::info!(analysis_id = %id, "URL submitted");
                    ids.push(id);
                }
                Err(err) => tracing::error!("Submission failed, skipping URL: {err}"),
            }
        }
        ids
    }

    async fn submit(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.urls_endpoint)
            .form(&[("url", url)])
            .send()
            .await?;

        let status = response.status();
        tracing::info!("Status code: {}", status.as_u16());
        if !status.is_success() {
            return Err(Error::Reputation(format!(
                "submission returned HTTP {status}"
            )));
        }

        let body: SubmissionResponse = response
            .json()
            .await
            .map_err(|e| Error::Reputation(format!("malformed submission response: {e}")))?;
        Ok(body.data.id)
    }

    /// Retrieval phase. Returns one record per id that could be fetched.
    pub async fn fetch_all(&self, ids: &[String]) -> Vec<AnalysisRecord> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch(id).await {
                Ok(record) => {
                    tracing::info!(
                        url_id = %record.url_id,
                        score = %record.score,
                        "Analysis retrieved"
                    );
                    records.push(record);
                }
                Err(err) => tracing::error!(analysis_id = %id, "Retrieval failed, skipping: {err}"),
            }
        }
        records
    }

    async fn fetch(&self, id: &str) -> Result<AnalysisRecord> {
        let url = format!("{}/{}", self.analyses_endpoint, id);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        tracing::info!("Status code: {}", status.as_u16());
        if !status.is_success() {
            return Err(Error::Reputation(format!("analysis returned HTTP {status}")));
        }

        let body: AnalysisResponse = response
            .json()
            .await
            .map_err(|e| Error::Reputation(format!("malformed analysis response: {e}")))?;
        body.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_sums_categories() {
        let stats = AnalysisStats {
            malicious: 2,
            suspicious: 1,
            undetected: 5,
            harmless: 12,
        };
        let score = Score::from_stats(&stats).unwrap();
        assert_eq!(score, Score { malicious: 3, total: 20 });
        assert_eq!(score.to_string(), "3/20");
    }

    #[test]
    fn clean_score_renders_zero_numerator() {
        assert_eq!(
            Score::from_stats(&AnalysisStats::default()).unwrap().to_string(),
            "0/0"
        );
    }

    #[test]
    fn analysis_body_maps_to_record() {
        let body = r#"{
            "meta": {"url_info": {"id": "abc123", "url": "http://evil.test/"}},
            "data": {"attributes": {"stats": {
                "malicious": 4, "suspicious": 0, "undetected": 10, "harmless": 50,
                "timeout": 3
            }, "status": "completed"}, "id": "u-abc", "type": "analysis"}
        }"#;
        let response: AnalysisResponse = serde_json::from_str(body).unwrap();
        let record = AnalysisRecord::try_from(response).unwrap();
        assert_eq!(record.url_id, "abc123");
        assert_eq!(record.source_url, "http://evil.test/");
        assert_eq!(record.score.to_string(), "4/64");
    }

    #[test]
    fn oversized_counts_do_not_score() {
        let stats = AnalysisStats {
            malicious: u64::MAX,
            suspicious: 1,
            undetected: 0,
            harmless: 0,
        };
        assert_eq!(Score::from_stats(&stats), None);

        let stats = AnalysisStats {
            malicious: 1,
            suspicious: 0,
            undetected: u64::MAX,
            harmless: 0,
        };
        assert_eq!(Score::from_stats(&stats), None);
    }

    #[test]
    fn missing_stat_is_rejected() {
        let body = r#"{
            "meta": {"url_info": {"id": "abc", "url": "http://x.test/"}},
            "data": {"attributes": {"stats": {"malicious": 1}}}
        }"#;
        assert!(serde_json::from_str::<AnalysisResponse>(body).is_err());
    }

    #[test]
    fn rejects_unusable_api_key() {
        let options = ReputationOptions::default();
        assert!(matches!(
            ReputationClient::new(&options, "bad\nkey"),
            Err(Error::Config(_))
        ));
    }
}
