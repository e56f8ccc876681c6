//! The remote tailoring service.
//!
//! [`RunEndpoint`] is the seam the orchestrator talks through; [`HttpRunEndpoint`] is the real
//! multipart client. Tests substitute an in-memory endpoint.

use crate::error::RunError;
use crate::model::{RunConfig, RunRequest, RunResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;

/// What came back from the run endpoint: the HTTP status and the decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReply {
    pub http_status: u16,
    pub payload: RunResult,
}

impl EndpointReply {
    pub fn ok(payload: RunResult) -> Self {
        Self {
            http_status: 200,
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status) && self.payload.is_ok()
    }

    /// Classify the reply: a success result, or a server rejection carrying its message.
    pub fn into_result(self) -> std::result::Result<RunResult, RunError> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(RunError::rejected(
                Some(self.http_status),
                self.payload.message,
            ))
        }
    }
}

#[async_trait]
pub trait RunEndpoint: Send + Sync {
    /// Dispatch one run. Transport problems and unreadable payloads are errors; a decoded
    /// payload is returned as-is, whatever its status.
    async fn run(&self, request: RunRequest) -> std::result::Result<EndpointReply, RunError>;
}

#[derive(Debug, Deserialize)]
struct HealthPayload {
    status: String,
}

pub struct HttpRunEndpoint {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRunEndpoint {
    pub fn new(cfg: &RunConfig) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid service URL {}", cfg.base_url))?;
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("cannot join {path} onto {}", self.base_url))
    }

    fn build_form(request: &RunRequest) -> Form {
        let cv = Part::bytes(request.cv_file.bytes.to_vec())
            .file_name(request.cv_file.file_name.clone());
        request
            .form_fields()
            .into_iter()
            .fold(Form::new().part("cv_file", cv), |form, (name, value)| {
                form.text(name, value)
            })
    }

    /// `GET /api/health`; true when the service answers `{"status":"ok"}`.
    pub async fn health(&self) -> Result<bool> {
        let url = self.url("/api/health")?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let payload: HealthPayload = resp.json().await.context("decode health payload")?;
        Ok(payload.status == "ok")
    }

    /// Fetch one produced artifact by its absolute URL.
    pub async fn fetch_artifact(&self, url: Url) -> Result<Bytes> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.bytes()
            .await
            .with_context(|| format!("read body of {url}"))
    }
}

#[async_trait]
impl RunEndpoint for HttpRunEndpoint {
    async fn run(&self, request: RunRequest) -> std::result::Result<EndpointReply, RunError> {
        let url = self.url("/api/run").map_err(|e| RunError::transport(format!("{e:#}")))?;
        tracing::info!(
            %url,
            job_source = %request.job_source,
            cv = %request.cv_file.file_name,
            "dispatching run"
        );

        let resp = self
            .client
            .post(url)
            .multipart(Self::build_form(&request))
            .send()
            .await
            .map_err(RunError::transport)?;
        let http_status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(RunError::transport)?;

        match serde_json::from_slice::<RunResult>(&body) {
            Ok(payload) => Ok(EndpointReply {
                http_status,
                payload,
            }),
            Err(e) => {
                tracing::warn!(http_status, error = %e, "unreadable run payload");
                Err(RunError::rejected(Some(http_status), None))
            }
        }
    }
}
