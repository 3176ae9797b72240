use std::future::Future;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::state::SelectedFile;

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRequest {
    pub model: String,
    pub embedding_model: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub similarity_threshold: f64,
    pub file_paths: Vec<String>,
}

/// Acknowledgment from `/process`. Only `status` is read, when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub question: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

/// The three endpoints of the document QA service.
pub trait Backend: Send + Sync {
    fn upload(
        &self,
        files: &[SelectedFile],
    ) -> impl Future<Output = Result<UploadResponse, BackendError>> + Send;

    fn process(
        &self,
        request: &ProcessRequest,
    ) -> impl Future<Output = Result<ProcessResponse, BackendError>> + Send;

    fn query(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<QueryResponse, BackendError>> + Send;
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn form_for(files: &[SelectedFile]) -> Result<Form, BackendError> {
        let mut form = Form::new();
        for file in files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| BackendError::Io {
                    path: file.path.display().to_string(),
                    source,
                })?;
            let part = Part::bytes(bytes)
                .file_name(file.name.clone())
                .mime_str(content_type_for(&file.name))?;
            form = form.part("files", part);
        }
        Ok(form)
    }
}

impl Backend for BackendClient {
    async fn upload(&self, files: &[SelectedFile]) -> Result<UploadResponse, BackendError> {
        let form = Self::form_for(files).await?;
        tracing::debug!(count = files.len(), "uploading files");

        let response = self
            .client
            .post(self.url("upload"))
            .multipart(form)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Any 2xx counts as done. The ack body is read for `status` only when it
    /// parses.
    async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse, BackendError> {
        let response = self
            .client
            .post(self.url("process"))
            .json(request)
            .send()
            .await?;

        let body = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|err| {
            tracing::debug!(%err, "process acknowledgment not understood, ignoring it");
            ProcessResponse::default()
        }))
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, BackendError> {
        let response = self
            .client
            .post(self.url("query"))
            .json(request)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::from_status_body(status.as_u16(), &body))
}

fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".txt") || lower.ends_with(".md") {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}
