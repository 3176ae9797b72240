//! UI-agnostic console state.
//!
//! Every user action maps to one method on [`ConsoleState`]. Methods that start
//! a network round-trip return the request to send; the matching `finish_*`
//! method applies the result once it arrives.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{QueryRequest, QueryResponse};
use crate::error::BackendError;
use crate::pipeline::IndexBuildOutcome;

pub const BUILD_FAILED_MESSAGE: &str = "Failed to build the index. Please try again.";
pub const QUERY_FAILED_MESSAGE: &str = "An error occurred while processing your question.";

/// Parameters sent to `/process` (and the model to `/query`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub model: String,
    pub embedding_model: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub similarity_threshold: f64,
}

/// A single-field configuration edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    Model(String),
    EmbeddingModel(String),
    ChunkSize(u32),
    ChunkOverlap(u32),
    SimilarityThreshold(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    ChunkSize,
    ChunkOverlap,
    SimilarityThreshold,
}

#[derive(Debug, Error, PartialEq)]
#[error("{field} expects {expected}, got {input:?}")]
pub struct ParseFieldError {
    pub field: &'static str,
    pub expected: &'static str,
    pub input: String,
}

impl NumericField {
    pub fn label(&self) -> &'static str {
        match self {
            NumericField::ChunkSize => "Chunk Size",
            NumericField::ChunkOverlap => "Chunk Overlap",
            NumericField::SimilarityThreshold => "Similarity Threshold",
        }
    }

    pub fn current(&self, config: &Configuration) -> String {
        match self {
            NumericField::ChunkSize => config.chunk_size.to_string(),
            NumericField::ChunkOverlap => config.chunk_overlap.to_string(),
            NumericField::SimilarityThreshold => config.similarity_threshold.to_string(),
        }
    }

    /// Parse edited text into an update. Only the type is checked; ranges are
    /// left to the backend.
    pub fn parse(&self, input: &str) -> Result<ConfigUpdate, ParseFieldError> {
        let text = input.trim();
        let error = |expected| ParseFieldError {
            field: self.label(),
            expected,
            input: input.to_string(),
        };

        match self {
            NumericField::ChunkSize => text
                .parse()
                .map(ConfigUpdate::ChunkSize)
                .map_err(|_| error("a whole number")),
            NumericField::ChunkOverlap => text
                .parse()
                .map(ConfigUpdate::ChunkOverlap)
                .map_err(|_| error("a whole number")),
            NumericField::SimilarityThreshold => text
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(ConfigUpdate::SimilarityThreshold)
                .ok_or_else(|| error("a number")),
        }
    }
}

/// A file chosen for upload. Content is read from `path` at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
}

impl SelectedFile {
    /// Relative paths are resolved against the working directory so the same
    /// file always compares equal however it was named.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = absolute_path(path.as_ref());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self { name, path }
    }
}

/// Make `path` absolute and drop `.` and `..` components lexically. Symlinks
/// are left alone, matching the paths a directory listing produces.
pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexBuildState {
    pub ready: bool,
    pub progress: u8,
    pub error: Option<String>,
}

/// One answered question in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}

/// Snapshot of what an index build needs, taken when the build starts.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub files: Vec<SelectedFile>,
    pub config: Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleState {
    pub config: Configuration,
    pub files: Vec<SelectedFile>,
    pub build: IndexBuildState,
    pub question: String,
    /// Latest answer, or the error text of the latest failed query.
    pub answer: String,
    /// Set when `answer` holds error text rather than a backend answer.
    #[serde(default)]
    pub answer_is_error: bool,
    pub sources: Vec<String>,
    pub transcript: Vec<ChatTurn>,
}

impl ConsoleState {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            files: Vec::new(),
            build: IndexBuildState::default(),
            question: String::new(),
            answer: String::new(),
            answer_is_error: false,
            sources: Vec::new(),
            transcript: Vec::new(),
        }
    }

    pub fn configure(&mut self, update: ConfigUpdate) {
        match update {
            ConfigUpdate::Model(model) => self.config.model = model,
            ConfigUpdate::EmbeddingModel(model) => self.config.embedding_model = model,
            ConfigUpdate::ChunkSize(size) => self.config.chunk_size = size,
            ConfigUpdate::ChunkOverlap(overlap) => self.config.chunk_overlap = overlap,
            ConfigUpdate::SimilarityThreshold(threshold) => {
                self.config.similarity_threshold = threshold
            }
        }
    }

    /// Replace the file selection. Never additive.
    pub fn select_files(&mut self, files: Vec<SelectedFile>) {
        self.files = files;
    }

    pub fn begin_build(&mut self) -> BuildRequest {
        self.build.progress = 0;
        BuildRequest {
            files: self.files.clone(),
            config: self.config.clone(),
        }
    }

    pub fn finish_build(&mut self, outcome: &IndexBuildOutcome) {
        match outcome.error() {
            None => {
                self.build.progress = 100;
                self.build.ready = true;
                self.build.error = None;
            }
            Some(error) => {
                tracing::debug!(%error, "recording failed index build");
                self.fail_build();
            }
        }
    }

    /// Record a failed build. A failed rebuild leaves an earlier index usable
    /// on the backend, so `ready` is not cleared.
    pub fn fail_build(&mut self) {
        self.build.progress = 0;
        self.build.error = Some(BUILD_FAILED_MESSAGE.to_string());
    }

    pub fn can_ask(&self) -> bool {
        self.build.ready
    }

    /// Request for the current question, or `None` when asking is disabled or
    /// the question is blank.
    pub fn begin_query(&self) -> Option<QueryRequest> {
        if !self.can_ask() || self.question.trim().is_empty() {
            return None;
        }

        Some(QueryRequest {
            question: self.question.clone(),
            model: self.config.model.clone(),
        })
    }

    pub fn finish_query(
        &mut self,
        question: String,
        result: Result<QueryResponse, BackendError>,
    ) {
        match result {
            Ok(response) => {
                let sources = response.sources.unwrap_or_default();
                self.answer = response.answer.clone();
                self.answer_is_error = false;
                self.sources = sources.clone();
                self.transcript.push(ChatTurn {
                    question,
                    answer: response.answer,
                    sources,
                });
                self.question.clear();
            }
            Err(err) => {
                self.answer = err.answer_message();
                self.answer_is_error = true;
                self.sources.clear();
            }
        }
    }

    /// Record a query that ended without any response to report.
    pub fn fail_query(&mut self) {
        self.answer = QUERY_FAILED_MESSAGE.to_string();
        self.answer_is_error = true;
        self.sources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_state() -> ConsoleState {
        let mut state = ConsoleState::new(Configuration::default());
        state.build.ready = true;
        state.build.progress = 100;
        state
    }

    fn answer(text: &str, sources: Option<Vec<&str>>) -> QueryResponse {
        QueryResponse {
            answer: text.to_string(),
            sources: sources.map(|s| s.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn test_configure_touches_one_field() {
        let updates = vec![
            ConfigUpdate::Model("gpt-4o".to_string()),
            ConfigUpdate::EmbeddingModel("text-embedding-3-small".to_string()),
            ConfigUpdate::ChunkSize(500),
            ConfigUpdate::ChunkOverlap(50),
            ConfigUpdate::SimilarityThreshold(0.25),
        ];

        for update in updates {
            let mut state = ConsoleState::new(Configuration::default());
            let before = state.config.clone();
            state.configure(update.clone());

            let after = &state.config;
            let changed = [
                before.model != after.model,
                before.embedding_model != after.embedding_model,
                before.chunk_size != after.chunk_size,
                before.chunk_overlap != after.chunk_overlap,
                before.similarity_threshold != after.similarity_threshold,
            ];
            assert_eq!(changed.iter().filter(|c| **c).count(), 1, "{:?}", update);
        }
    }

    #[test]
    fn test_numeric_parse() {
        assert_eq!(
            NumericField::ChunkSize.parse(" 1500 "),
            Ok(ConfigUpdate::ChunkSize(1500))
        );
        assert_eq!(
            NumericField::SimilarityThreshold.parse("0.35"),
            Ok(ConfigUpdate::SimilarityThreshold(0.35))
        );
        assert!(NumericField::ChunkOverlap.parse("-5").is_err());
        assert!(NumericField::ChunkSize.parse("abc").is_err());
        assert!(NumericField::SimilarityThreshold.parse("NaN").is_err());
    }

    #[test]
    fn test_numeric_parse_has_no_range_check() {
        assert_eq!(
            NumericField::SimilarityThreshold.parse("1.5"),
            Ok(ConfigUpdate::SimilarityThreshold(1.5))
        );
        let mut state = ConsoleState::new(Configuration::default());
        state.configure(ConfigUpdate::ChunkOverlap(5000));
        assert!(state.config.chunk_overlap > state.config.chunk_size);
    }

    #[test]
    fn test_select_files_replaces() {
        let mut state = ConsoleState::new(Configuration::default());
        state.select_files(vec![
            SelectedFile::from_path("/docs/a.pdf"),
            SelectedFile::from_path("/docs/b.pdf"),
        ]);
        state.select_files(vec![SelectedFile::from_path("/other/c.pdf")]);

        assert_eq!(state.files.len(), 1);
        assert_eq!(state.files[0].name, "c.pdf");

        state.select_files(Vec::new());
        assert!(state.files.is_empty());
    }

    #[test]
    fn test_begin_query_guarded_by_ready() {
        let mut state = ConsoleState::new(Configuration::default());
        state.question = "What is X?".to_string();
        assert!(!state.can_ask());
        assert!(state.begin_query().is_none());

        state.build.ready = true;
        let request = state.begin_query().unwrap();
        assert_eq!(request.question, "What is X?");
        assert_eq!(request.model, state.config.model);
    }

    #[test]
    fn test_blank_question_not_sent() {
        let mut state = ready_state();
        state.question = "   ".to_string();
        assert!(state.begin_query().is_none());
    }

    #[test]
    fn test_successful_query_appends_turn() {
        let mut state = ready_state();
        state.question = "What is X?".to_string();

        state.finish_query(
            "What is X?".to_string(),
            Ok(answer("Y", Some(vec!["doc1.pdf"]))),
        );

        assert_eq!(state.transcript.len(), 1);
        assert_eq!(state.transcript[0].question, "What is X?");
        assert_eq!(state.transcript[0].answer, "Y");
        assert_eq!(state.answer, "Y");
        assert_eq!(state.sources, vec!["doc1.pdf".to_string()]);
        assert_eq!(state.question, "");
    }

    #[test]
    fn test_missing_sources_become_empty() {
        let mut state = ready_state();
        state.sources = vec!["stale.pdf".to_string()];
        state.finish_query("Q".to_string(), Ok(answer("A", None)));
        assert!(state.sources.is_empty());
        assert!(state.transcript[0].sources.is_empty());
    }

    #[test]
    fn test_failed_query_shows_error_only() {
        let mut state = ready_state();
        state.question = "What is X?".to_string();
        state.sources = vec!["old.pdf".to_string()];

        state.finish_query(
            "What is X?".to_string(),
            Err(BackendError::Status {
                status: 500,
                detail: Some("index not found".to_string()),
            }),
        );

        assert_eq!(state.answer, "Error: 500 - index not found");
        assert!(state.answer_is_error);
        assert!(state.transcript.is_empty());
        assert!(state.sources.is_empty());
        assert_eq!(state.question, "What is X?");
    }

    #[test]
    fn test_error_flag_follows_latest_answer() {
        let mut state = ready_state();
        state.finish_query("first".to_string(), Ok(answer("1", None)));
        assert!(!state.answer_is_error);

        state.fail_query();
        assert!(state.answer_is_error);
        assert_eq!(state.answer, QUERY_FAILED_MESSAGE);

        // An answer that differs from the last transcript entry is still an answer
        state.finish_query("second".to_string(), Ok(answer("2", None)));
        state.transcript.clear();
        assert!(!state.answer_is_error);
    }

    #[test]
    fn test_relative_file_paths_resolved() {
        let cwd = std::env::current_dir().unwrap();

        let file = SelectedFile::from_path("docs/./reports/../a.pdf");
        assert_eq!(file.path, cwd.join("docs").join("a.pdf"));
        assert_eq!(file.name, "a.pdf");

        assert_eq!(
            SelectedFile::from_path("a.pdf"),
            SelectedFile::from_path(cwd.join("a.pdf"))
        );
        assert_eq!(SelectedFile::from_path("/docs/a.pdf").path, PathBuf::from("/docs/a.pdf"));
    }

    #[test]
    fn test_transcript_keeps_order() {
        let mut state = ready_state();
        for (q, a) in [("first", "1"), ("second", "2"), ("third", "3")] {
            state.finish_query(q.to_string(), Ok(answer(a, None)));
        }
        state.finish_query(
            "broken".to_string(),
            Err(BackendError::Status { status: 400, detail: None }),
        );

        let questions: Vec<&str> = state.transcript.iter().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_build_outcomes() {
        let mut state = ConsoleState::new(Configuration::default());
        state.begin_build();
        state.finish_build(&IndexBuildOutcome::UploadFailed(BackendError::Status {
            status: 500,
            detail: None,
        }));
        assert!(!state.build.ready);
        assert_eq!(state.build.progress, 0);
        assert_eq!(state.build.error.as_deref(), Some(BUILD_FAILED_MESSAGE));

        state.begin_build();
        state.finish_build(&IndexBuildOutcome::Ready {
            file_paths: vec!["uploads/a.pdf".to_string()],
            status: None,
        });
        assert!(state.build.ready);
        assert_eq!(state.build.progress, 100);
        assert!(state.build.error.is_none());
    }

    #[test]
    fn test_state_serializes() {
        let mut state = ready_state();
        state.select_files(vec![SelectedFile::from_path("a.pdf")]);
        let json = serde_json::to_string(&state).unwrap();
        let back: ConsoleState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
