use std::path::PathBuf;

use pdfchat_core::client::QueryResponse;
use pdfchat_core::{
    ask, build_index, BackendClient, BackendError, Config, ConfigUpdate, ConsoleState,
    IndexBuildOutcome, NumericField, EMBEDDING_MODELS, GENERATION_MODELS,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::files::FileBrowser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Settings,
    Question,
    Answer,
    History,
}

impl FocusPane {
    pub fn next(&self) -> Self {
        match self {
            FocusPane::Settings => FocusPane::Question,
            FocusPane::Question => FocusPane::Answer,
            FocusPane::Answer => FocusPane::History,
            FocusPane::History => FocusPane::Settings,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FocusPane::Settings => FocusPane::History,
            FocusPane::Question => FocusPane::Settings,
            FocusPane::Answer => FocusPane::Question,
            FocusPane::History => FocusPane::Answer,
        }
    }
}

/// Rows of the settings form, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSection {
    Model,
    EmbeddingModel,
    Files,
    ChunkSize,
    ChunkOverlap,
    SimilarityThreshold,
    Build,
}

impl SettingsSection {
    pub fn all() -> &'static [SettingsSection] {
        &[
            SettingsSection::Model,
            SettingsSection::EmbeddingModel,
            SettingsSection::Files,
            SettingsSection::ChunkSize,
            SettingsSection::ChunkOverlap,
            SettingsSection::SimilarityThreshold,
            SettingsSection::Build,
        ]
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        let all = Self::all();
        all[(self.index() + 1).min(all.len() - 1)]
    }

    pub fn prev(&self) -> Self {
        Self::all()[self.index().saturating_sub(1)]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsSection::Model => "Model",
            SettingsSection::EmbeddingModel => "Embedding Model",
            SettingsSection::Files => "Files",
            SettingsSection::Build => "Build Index",
            other => other.numeric_field().map(|f| f.label()).unwrap_or(""),
        }
    }

    pub fn numeric_field(&self) -> Option<NumericField> {
        match self {
            SettingsSection::ChunkSize => Some(NumericField::ChunkSize),
            SettingsSection::ChunkOverlap => Some(NumericField::ChunkOverlap),
            SettingsSection::SimilarityThreshold => Some(NumericField::SimilarityThreshold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picker {
    Model,
    EmbeddingModel,
}

impl Picker {
    pub fn items(&self) -> &'static [&'static str] {
        match self {
            Picker::Model => GENERATION_MODELS,
            Picker::EmbeddingModel => EMBEDDING_MODELS,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Picker::Model => " Select Model (Enter to select, Esc to cancel) ",
            Picker::EmbeddingModel => " Select Embedding Model (Enter to select, Esc to cancel) ",
        }
    }
}

pub type QueryTask = JoinHandle<(String, Result<QueryResponse, BackendError>)>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub section: SettingsSection,
    pub state: ConsoleState,
    pub client: BackendClient,
    /// Write model choices back to the config file.
    pub persist_preferences: bool,

    // Text editing
    pub question_cursor: usize,
    pub field_input: String,
    pub field_cursor: usize,

    // Popups
    pub picker: Option<Picker>,
    pub picker_state: ListState,
    pub file_browser: Option<FileBrowser>,

    // In-flight requests
    pub build_task: Option<JoinHandle<IndexBuildOutcome>>,
    pub query_task: Option<QueryTask>,

    // Status line and animation
    pub status_message: Option<String>,
    pub animation_frame: u8,

    // Scrolling (heights are updated during render)
    pub answer_scroll: u16,
    pub history_scroll: u16,
    pub history_follow: bool,
    pub answer_area: Option<Rect>,
    pub history_area: Option<Rect>,
}

impl App {
    pub fn new(state: ConsoleState, client: BackendClient) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Settings,
            section: SettingsSection::Model,
            state,
            client,
            persist_preferences: false,

            question_cursor: 0,
            field_input: String::new(),
            field_cursor: 0,

            picker: None,
            picker_state: ListState::default(),
            file_browser: None,

            build_task: None,
            query_task: None,

            status_message: None,
            animation_frame: 0,

            answer_scroll: 0,
            history_scroll: 0,
            history_follow: true,
            answer_area: None,
            history_area: None,
        }
    }

    pub fn is_building(&self) -> bool {
        self.build_task.is_some()
    }

    pub fn is_querying(&self) -> bool {
        self.query_task.is_some()
    }

    pub fn tick_animation(&mut self) {
        if self.is_building() || self.is_querying() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Settings form
    pub fn section_down(&mut self) {
        self.section = self.section.next();
    }

    pub fn section_up(&mut self) {
        self.section = self.section.prev();
    }

    pub fn begin_field_edit(&mut self) {
        if let Some(field) = self.section.numeric_field() {
            self.field_input = field.current(&self.state.config);
            self.field_cursor = self.field_input.chars().count();
            self.input_mode = InputMode::Editing;
        }
    }

    /// Parse the edited text into the field. Unparseable text keeps the old value.
    pub fn commit_field_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(field) = self.section.numeric_field() else {
            return;
        };

        match field.parse(&self.field_input) {
            Ok(update) => {
                self.state.configure(update);
                self.status_message = None;
            }
            Err(err) => {
                tracing::debug!(%err, "rejected field edit");
                self.status_message = Some(err.to_string());
            }
        }
        self.field_input.clear();
        self.field_cursor = 0;
    }

    pub fn cancel_field_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.field_input.clear();
        self.field_cursor = 0;
    }

    // Model pickers
    pub fn open_picker(&mut self, picker: Picker) {
        let current = match picker {
            Picker::Model => &self.state.config.model,
            Picker::EmbeddingModel => &self.state.config.embedding_model,
        };
        let index = picker.items().iter().position(|m| *m == current.as_str()).unwrap_or(0);
        self.picker_state.select(Some(index));
        self.picker = Some(picker);
    }

    pub fn picker_nav_down(&mut self) {
        if let Some(picker) = self.picker {
            let len = picker.items().len();
            let i = self.picker_state.selected().unwrap_or(0);
            self.picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn picker_nav_up(&mut self) {
        let i = self.picker_state.selected().unwrap_or(0);
        self.picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_picked(&mut self) {
        let Some(picker) = self.picker.take() else {
            return;
        };
        let Some(model) = self
            .picker_state
            .selected()
            .and_then(|i| picker.items().get(i))
            .map(|m| m.to_string())
        else {
            return;
        };

        let saved = match picker {
            Picker::Model => {
                self.state.configure(ConfigUpdate::Model(model.clone()));
                self.persist_preferences.then(|| Config::save_default_model(&model))
            }
            Picker::EmbeddingModel => {
                self.state.configure(ConfigUpdate::EmbeddingModel(model.clone()));
                self.persist_preferences
                    .then(|| Config::save_default_embedding_model(&model))
            }
        };

        if let Some(Err(err)) = saved {
            tracing::warn!(%err, "could not save model preference");
        }
    }

    // File picker
    pub fn open_file_browser(&mut self) {
        let start_dir = self
            .state
            .files
            .first()
            .and_then(|f| f.path.parent().map(PathBuf::from))
            .filter(|dir| dir.is_dir())
            .or_else(|| std::env::current_dir().ok())
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        match FileBrowser::open(&start_dir, &self.state.files) {
            Ok(browser) => self.file_browser = Some(browser),
            Err(err) => self.status_message = Some(err.to_string()),
        }
    }

    pub fn accept_file_browser(&mut self) {
        if let Some(browser) = self.file_browser.take() {
            let files = browser.accept();
            tracing::info!(count = files.len(), "file selection replaced");
            self.state.select_files(files);
        }
    }

    // Requests
    pub fn start_build(&mut self) {
        if self.is_building() {
            return;
        }

        let request = self.state.begin_build();
        let client = self.client.clone();
        self.status_message = Some(format!(
            "Uploading {} file(s) to {}",
            request.files.len(),
            self.client.base_url()
        ));
        self.build_task = Some(tokio::spawn(async move {
            build_index(&client, &request).await
        }));
    }

    pub fn start_query(&mut self) {
        if self.is_querying() {
            return;
        }
        let Some(request) = self.state.begin_query() else {
            return;
        };

        self.input_mode = InputMode::Normal;
        let client = self.client.clone();
        self.query_task = Some(tokio::spawn(async move {
            let result = ask(&client, &request).await;
            (request.question, result)
        }));
    }

    /// Apply the results of any finished requests.
    pub async fn poll_tasks(&mut self) {
        if self.build_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.build_task.take() {
                match task.await {
                    Ok(outcome) => self.apply_build_outcome(outcome),
                    Err(err) => {
                        tracing::error!(%err, "index build task ended abnormally");
                        self.state.fail_build();
                        self.status_message = None;
                    }
                }
            }
        }

        if self.query_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.query_task.take() {
                match task.await {
                    Ok((question, result)) => self.apply_query_result(question, result),
                    Err(err) => {
                        tracing::error!(%err, "query task ended abnormally");
                        self.state.fail_query();
                    }
                }
            }
        }
    }

    pub fn apply_build_outcome(&mut self, outcome: IndexBuildOutcome) {
        self.state.finish_build(&outcome);
        self.status_message = match &outcome {
            IndexBuildOutcome::Ready { status, .. } => {
                Some(status.clone().unwrap_or_else(|| "Index ready".to_string()))
            }
            IndexBuildOutcome::UploadFailed(err) => Some(format!("Upload failed: {}", err)),
            IndexBuildOutcome::ProcessFailed { error, .. } => {
                Some(format!("Processing failed: {}", error))
            }
        };
    }

    pub fn apply_query_result(
        &mut self,
        question: String,
        result: Result<QueryResponse, BackendError>,
    ) {
        let succeeded = result.is_ok();
        self.state.finish_query(question, result);
        self.answer_scroll = 0;
        if succeeded {
            self.question_cursor = 0;
            self.history_follow = true;
        }
    }

    // Scrolling
    pub fn scroll_answer(&mut self, down: bool) {
        self.answer_scroll = if down {
            self.answer_scroll.saturating_add(1)
        } else {
            self.answer_scroll.saturating_sub(1)
        };
    }

    pub fn scroll_history(&mut self, down: bool) {
        self.history_follow = false;
        self.history_scroll = if down {
            self.history_scroll.saturating_add(1)
        } else {
            self.history_scroll.saturating_sub(1)
        };
    }
}
