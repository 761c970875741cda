//! HTTP client for the Sanity query API.

use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::application::repos::{ContentStore, FetchMode, QueryParams, RepoError};
use crate::config::SanitySettings;

use super::error::InfraError;

const METRIC_QUERY_MS: &str = "geographer_sanity_query_ms";

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    result: Value,
}

/// Queries one Sanity dataset over HTTP.
#[derive(Clone, Debug)]
pub struct SanityClient {
    client: Client,
    live_base: Url,
    cdn_base: Url,
    api_version: String,
    dataset: String,
    use_cdn: bool,
    token: Option<String>,
    perspective: Option<String>,
}

impl SanityClient {
    pub fn new(settings: &SanitySettings) -> Result<Self, InfraError> {
        let project_id = settings
            .project_id
            .as_deref()
            .ok_or_else(|| InfraError::configuration("sanity project id is not configured"))?;

        let (live_base, cdn_base) = match &settings.base_url {
            Some(base) => (base.clone(), base.clone()),
            None => (
                parse_base(&format!("https://{project_id}.api.sanity.io/"))?,
                parse_base(&format!("https://{project_id}.apicdn.sanity.io/"))?,
            ),
        };

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            live_base,
            cdn_base,
            api_version: normalize_api_version(&settings.api_version),
            dataset: settings.dataset.clone(),
            use_cdn: settings.use_cdn,
            token: settings.read_token.clone(),
            perspective: settings.perspective.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("geographer/", env!("CARGO_PKG_VERSION"))
    }

    /// Full query URL, with GROQ parameters encoded as `$name=<json>`.
    pub fn query_url(
        &self,
        groq: &str,
        params: &QueryParams,
        mode: FetchMode,
    ) -> Result<Url, RepoError> {
        let base = match mode {
            FetchMode::Cached if self.use_cdn => &self.cdn_base,
            _ => &self.live_base,
        };
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| RepoError::transport("content store base url cannot carry a path"))?
            .pop_if_empty()
            .extend([self.api_version.as_str(), "data", "query", self.dataset.as_str()]);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", groq);
            for (name, value) in params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
            if let Some(perspective) = &self.perspective {
                pairs.append_pair("perspective", perspective);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ContentStore for SanityClient {
    async fn query(
        &self,
        groq: &str,
        params: &QueryParams,
        mode: FetchMode,
    ) -> Result<Value, RepoError> {
        let url = self.query_url(groq, params, mode)?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        histogram!(METRIC_QUERY_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepoError::Status {
                status: status.as_u16(),
                message: error_description(status, &body),
            });
        }

        let envelope: QueryEnvelope = response.json().await.map_err(map_reqwest_error)?;
        debug!(
            target = "geographer::sanity",
            ?mode,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sanity query completed"
        );
        Ok(envelope.result)
    }
}

fn parse_base(raw: &str) -> Result<Url, InfraError> {
    Url::parse(raw).map_err(|err| InfraError::configuration(format!("invalid url `{raw}`: {err}")))
}

/// `2024-01-01` and `v2024-01-01` both become `v2024-01-01`.
fn normalize_api_version(version: &str) -> String {
    let version = version.trim();
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    }
}

fn map_reqwest_error(err: reqwest::Error) -> RepoError {
    if err.is_timeout() {
        RepoError::Timeout
    } else if err.is_decode() {
        RepoError::decode(err)
    } else {
        RepoError::transport(err)
    }
}

/// Pull `error.description` out of a Sanity error body when present.
fn error_description(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/description")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}
