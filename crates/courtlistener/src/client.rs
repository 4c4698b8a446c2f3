use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::LookupError;
use crate::rate_limit::RateGate;
use crate::retry::RetryPolicy;
use crate::{CaseLookup, FoundCase};

pub const DEFAULT_BASE_URL: &str = "https://www.courtlistener.com/api/rest/v4";
pub const TOKEN_ENV: &str = "COURTLISTENER_API_TOKEN";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    /// Minimum spacing between requests from this client
    pub rate_limit_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            rate_limit_delay: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ClientConfig {
    /// Defaults with the API token taken from `COURTLISTENER_API_TOKEN`.
    pub fn from_env() -> Self {
        Self {
            api_token: std::env::var(TOKEN_ENV).ok(),
            ..Default::default()
        }
    }
}

/// One entry of the citation-lookup response.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupMatch {
    #[serde(default)]
    pub citation: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub case_name: Option<String>,
    /// URLs of the opinions that make up this cluster
    #[serde(default)]
    pub sub_opinions: Vec<String>,
    #[serde(flatten)]
    pub text: OpinionText,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpinionText {
    #[serde(default)]
    pub html_with_citations: Option<String>,
    #[serde(default)]
    pub plain_text: Option<String>,
}

impl OpinionText {
    /// Annotated HTML stripped to text when present, otherwise plain text.
    pub fn best_text(&self) -> Option<String> {
        if let Some(html) = self.html_with_citations.as_deref().filter(|h| !h.trim().is_empty()) {
            return Some(strip_markup(html));
        }
        self.plain_text
            .clone()
            .filter(|text| !text.trim().is_empty())
    }
}

pub fn strip_markup(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect()
}

/// Client for the CourtListener REST API.
///
/// Every request passes through one shared `RateGate` and the retry policy,
/// so a single client can be shared by all workers of a run.
pub struct CourtListenerClient {
    base_url: String,
    client: reqwest::Client,
    gate: RateGate,
    retry: RetryPolicy,
}

impl CourtListenerClient {
    pub fn new(config: ClientConfig, retry: RetryPolicy) -> Result<Self, LookupError> {
        let token = config
            .api_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                LookupError::Config(format!(
                    "CourtListener API token required. Set {} or pass api_token.",
                    TOKEN_ENV
                ))
            })?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {}", token.trim()))
            .map_err(|e| LookupError::Config(format!("Invalid API token: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            gate: RateGate::new(config.rate_limit_delay),
            retry,
        })
    }

    /// Look up a citation and return the first matching cluster, if the
    /// service found one.
    pub async fn lookup_citation(&self, raw_text: &str) -> Result<Option<Cluster>, LookupError> {
        let matches = self
            .retry
            .retry("citation_lookup", || self.post_lookup(raw_text))
            .await?;

        Ok(matches
            .into_iter()
            .next()
            .filter(|m| m.status == 200)
            .and_then(|m| m.clusters.into_iter().next()))
    }

    /// Best available opinion text for a cluster, following the first
    /// sub-opinion link when the cluster only references it.
    pub async fn opinion_text(&self, cluster: &Cluster) -> Result<Option<String>, LookupError> {
        if let Some(url) = cluster.sub_opinions.first() {
            let opinion = self
                .retry
                .retry("opinion_fetch", || self.get_opinion(url))
                .await?;
            return Ok(opinion.best_text());
        }

        Ok(cluster.text.best_text())
    }

    async fn post_lookup(&self, raw_text: &str) -> Result<Vec<LookupMatch>, LookupError> {
        self.gate.wait().await;

        let url = format!("{}/citation-lookup/", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[("text", raw_text)])
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))
    }

    async fn get_opinion(&self, url: &str) -> Result<OpinionText, LookupError> {
        self.gate.wait().await;

        let response = self.client.get(url).send().await?;
        let response = error_for_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, LookupError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(LookupError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CaseLookup for CourtListenerClient {
    async fn find_case(&self, raw_text: &str) -> Result<Option<FoundCase>, LookupError> {
        let Some(cluster) = self.lookup_citation(raw_text).await? else {
            debug!(citation = raw_text, "No matching cluster");
            return Ok(None);
        };

        let opinion_text = self.opinion_text(&cluster).await?;

        Ok(Some(FoundCase {
            id: cluster.id.map(|id| id.to_string()),
            case_name: cluster.case_name.filter(|name| !name.is_empty()),
            opinion_text,
        }))
    }
}
