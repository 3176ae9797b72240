//! Index build and question round-trips against a [`Backend`].
//!
//! Building an index is two dependent calls: upload the files, then ask the
//! backend to process the returned paths. The steps are exposed separately so
//! each can be driven on its own; [`build_index`] chains them and stops at the
//! first failure.

use crate::client::{Backend, ProcessRequest, QueryRequest, QueryResponse};
use crate::error::BackendError;
use crate::state::{BuildRequest, Configuration, SelectedFile};

/// Where an index build ended.
#[derive(Debug)]
pub enum IndexBuildOutcome {
    Ready {
        file_paths: Vec<String>,
        status: Option<String>,
    },
    UploadFailed(BackendError),
    ProcessFailed {
        file_paths: Vec<String>,
        error: BackendError,
    },
}

impl IndexBuildOutcome {
    pub fn error(&self) -> Option<&BackendError> {
        match self {
            IndexBuildOutcome::Ready { .. } => None,
            IndexBuildOutcome::UploadFailed(error) => Some(error),
            IndexBuildOutcome::ProcessFailed { error, .. } => Some(error),
        }
    }
}

/// Step one: upload the selected files and return the server-side paths.
pub async fn upload_step<B: Backend>(
    backend: &B,
    files: &[SelectedFile],
) -> Result<Vec<String>, BackendError> {
    let response = backend.upload(files).await?;
    if response.file_paths.len() != files.len() {
        tracing::warn!(
            sent = files.len(),
            returned = response.file_paths.len(),
            "upload returned a different number of paths"
        );
    }
    Ok(response.file_paths)
}

/// Step two: ask the backend to chunk, embed and index the uploaded paths.
pub async fn process_step<B: Backend>(
    backend: &B,
    config: &Configuration,
    file_paths: Vec<String>,
) -> Result<Option<String>, BackendError> {
    let request = ProcessRequest {
        model: config.model.clone(),
        embedding_model: config.embedding_model.clone(),
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
        similarity_threshold: config.similarity_threshold,
        file_paths,
    };

    let ack = backend.process(&request).await?;
    Ok(ack.status)
}

pub async fn build_index<B: Backend>(backend: &B, request: &BuildRequest) -> IndexBuildOutcome {
    let file_paths = match upload_step(backend, &request.files).await {
        Ok(paths) => paths,
        Err(error) => {
            tracing::error!(%error, "upload failed");
            return IndexBuildOutcome::UploadFailed(error);
        }
    };

    match process_step(backend, &request.config, file_paths.clone()).await {
        Ok(status) => {
            tracing::info!(files = file_paths.len(), status = ?status, "index ready");
            IndexBuildOutcome::Ready { file_paths, status }
        }
        Err(error) => {
            tracing::error!(%error, "process failed");
            IndexBuildOutcome::ProcessFailed { file_paths, error }
        }
    }
}

pub async fn ask<B: Backend>(
    backend: &B,
    request: &QueryRequest,
) -> Result<QueryResponse, BackendError> {
    let result = backend.query(request).await;
    if let Err(error) = &result {
        tracing::warn!(%error, status = ?error.status(), model = %request.model, "query failed");
    }
    result
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;

    use crate::client::{Backend, ProcessRequest, ProcessResponse, QueryRequest, QueryResponse, UploadResponse};
    use crate::error::BackendError;
    use crate::state::SelectedFile;

    /// Scripted backend that records every call it receives.
    #[derive(Default)]
    pub struct MockBackend {
        pub upload_failure: Option<(u16, Option<String>)>,
        pub process_failure: Option<(u16, Option<String>)>,
        pub query_result: Option<Result<QueryResponse, (u16, Option<String>)>>,
        pub calls: Mutex<Vec<String>>,
        pub process_requests: Mutex<Vec<ProcessRequest>>,
    }

    impl MockBackend {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    fn status_error((status, detail): &(u16, Option<String>)) -> BackendError {
        BackendError::Status {
            status: *status,
            detail: detail.clone(),
        }
    }

    impl Backend for MockBackend {
        async fn upload(&self, files: &[SelectedFile]) -> Result<UploadResponse, BackendError> {
            self.record("upload");
            if let Some(failure) = &self.upload_failure {
                return Err(status_error(failure));
            }
            Ok(UploadResponse {
                file_paths: files
                    .iter()
                    .map(|f| format!("uploads/{}", f.name))
                    .collect(),
            })
        }

        async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse, BackendError> {
            self.record("process");
            self.process_requests.lock().unwrap().push(request.clone());
            if let Some(failure) = &self.process_failure {
                return Err(status_error(failure));
            }
            Ok(ProcessResponse {
                status: Some("Processing complete".to_string()),
            })
        }

        async fn query(&self, _request: &QueryRequest) -> Result<QueryResponse, BackendError> {
            self.record("query");
            match &self.query_result {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(failure)) => Err(status_error(failure)),
                None => Err(status_error(&(400, Some("no index".to_string())))),
            }
        }
    }
}
