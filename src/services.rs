//! Typed client for the two hosted collaborator functions.
//!
//! * `youtube-search`      — video search with AI summaries
//! * `summarize-document`  — summary / key points / action items for a text
//!
//! Both are opaque request/response endpoints under
//! `{base_url}/functions/v1/{name}`. Requests carry the project key twice,
//! as a bearer token and as an `apikey` header. Nothing is retried.

use crate::config::ServiceConfig;
use crate::error::EditorError;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

const VIDEO_SEARCH_FN: &str = "youtube-search";
const DOCUMENT_ANALYSIS_FN: &str = "summarize-document";

/// What the document-analysis function should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Summary,
    Keypoints,
    Action,
}

impl std::str::FromStr for AnalysisMode {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "summary" => Ok(AnalysisMode::Summary),
            "keypoints" | "key-points" => Ok(AnalysisMode::Keypoints),
            "action" | "actions" => Ok(AnalysisMode::Action),
            other => Err(EditorError::InvalidInput(format!(
                "unknown analysis mode '{other}' (summary, keypoints, action)"
            ))),
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub captions_available: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<VideoResult>,
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    text: &'a str,
    #[serde(rename = "type")]
    mode: AnalysisMode,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    summary: String,
}

/// `{"error": …}` body returned by a failing function.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: serde_json::Value,
}

impl ErrorPayload {
    fn message(&self) -> String {
        match &self.error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// HTTP client for the hosted functions.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    config: ServiceConfig,
}

impl ServiceClient {
    pub fn new(config: ServiceConfig) -> Result<Self, EditorError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EditorError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Search videos for `query`.
    ///
    /// A blank query is rejected locally without a request.
    pub async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoResult>, EditorError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EditorError::InvalidInput("search query is empty".into()));
        }

        let response: SearchResponse = self
            .invoke(VIDEO_SEARCH_FN, &SearchRequest { query, max_results })
            .await?;
        info!("Video search '{}' → {} results", query, response.videos.len());
        Ok(response.videos)
    }

    /// Summarise, list key points, or extract actions from `text`.
    ///
    /// Empty text is rejected locally without a request.
    pub async fn analyze_document(
        &self,
        text: &str,
        mode: AnalysisMode,
    ) -> Result<String, EditorError> {
        if text.trim().is_empty() {
            return Err(EditorError::InvalidInput("document text is empty".into()));
        }

        let response: AnalysisResponse = self
            .invoke(DOCUMENT_ANALYSIS_FN, &AnalysisRequest { text, mode })
            .await?;
        Ok(response.summary)
    }

    async fn invoke<Req, Resp>(&self, name: &str, request: &Req) -> Result<Resp, EditorError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.config.function_url(name);
        let failure = |detail: String| EditorError::ExternalServiceFailure {
            service: name.to_string(),
            detail,
        };

        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("apikey", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    failure(format!("timed out after {}s", self.config.timeout_secs))
                } else {
                    failure(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| failure(format!("failed to read response: {e}")))?;

        if let Ok(payload) = serde_json::from_str::<ErrorPayload>(&body) {
            return Err(failure(payload.message()));
        }
        if !status.is_success() {
            return Err(failure(format!("HTTP {}: {}", status, body.trim())));
        }

        serde_json::from_str(&body).map_err(|e| failure(format!("unexpected response: {e}")))
    }
}
