//! Viewport and navigation state machine
//!
//! The [`Navigator`] owns everything the UI loop mutates: the current
//! generation's rows, the selection and viewport, prompts, the pending
//! confirmation and the action in flight. It never blocks. Work that needs
//! I/O is queued as an [`Effect`] and its outcome comes back as a
//! [`WorkerMessage`].
//!
//! Rows are materialized on demand: only enough to fill the viewport plus a
//! read-ahead margin, or up to the target of a pending jump.

use chrono::Utc;
use gittree_core::{
    abbreviate, ActionKind, CommitDetails, CommitId, CommitRecord, FilterParams, Generation,
    GitTreeConfig, MutationRequest, Result, SourceConfig,
};
use gittree_git::validate::validate_ref_name;
use gittree_git::{parse_query, to_query, Batch, FilterEngine, SourceFactory};
use gittree_graph::{GlyphSet, GraphRow};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::command::{Command, Input, KeyContext};
use crate::view::GenerationView;
use crate::worker::{Effect, WorkerMessage};

/// Navigator tuning taken from the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorConfig {
    /// Rows materialized past the bottom of the viewport
    pub read_ahead: usize,
    /// Records per pull when loading toward a distant target
    pub batch_size: usize,
    /// Ask before destructive actions
    pub confirm_dangerous: bool,
    pub glyphs: GlyphSet,
}

impl NavigatorConfig {
    pub fn from_config(config: &GitTreeConfig) -> Self {
        Self {
            read_ahead: config.read_ahead,
            batch_size: config.batch_size.max(1),
            confirm_dangerous: config.confirm_dangerous,
            glyphs: if config.unicode {
                GlyphSet::Unicode
            } else {
                GlyphSet::Ascii
            },
        }
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self::from_config(&GitTreeConfig::default())
    }
}

/// Externally visible state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A pull or a mutation is outstanding
    Loading,
    /// A destructive action waits for yes/no
    ConfirmPending(MutationRequest),
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// Message shown in the status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Filter,
    BranchName,
    TagName,
}

impl PromptKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::BranchName => "new branch",
            Self::TagName => "new tag",
        }
    }
}

/// Single-line text prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

/// Details of the selected commit, loaded in the background
#[derive(Debug, Clone)]
pub struct DetailsPane {
    pub record: Arc<CommitRecord>,
    pub generation: Generation,
    pub details: Option<CommitDetails>,
    pub error: Option<String>,
}

impl DetailsPane {
    pub fn is_loading(&self) -> bool {
        self.details.is_none() && self.error.is_none()
    }
}

/// Selection move waiting for rows that are not loaded yet
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Row(usize),
    End,
    Commit(CommitId),
}

pub struct Navigator {
    factory: Arc<dyn SourceFactory>,
    config: NavigatorConfig,
    view: GenerationView,
    params: FilterParams,
    selected: usize,
    top: usize,
    height: usize,
    width: usize,
    glyphs: GlyphSet,
    pending: Option<Pending>,
    confirm: Option<MutationRequest>,
    dispatching: Option<MutationRequest>,
    prompt: Option<Prompt>,
    details: Option<DetailsPane>,
    help: bool,
    /// Commit to select once the next generation's rows arrive
    reselect: Option<CommitId>,
    refresh_deferred: bool,
    status: Option<Status>,
    exiting: bool,
    effects: Vec<Effect>,
}

impl Navigator {
    /// Start the first generation from an already validated source config
    pub fn new(
        factory: Arc<dyn SourceFactory>,
        params: FilterParams,
        source: SourceConfig,
        config: NavigatorConfig,
    ) -> Result<Self> {
        let generation = Generation::default().next();
        let view = GenerationView::new(generation, factory.create(&source)?, source);
        let mut navigator = Self {
            factory,
            config,
            view,
            params,
            selected: 0,
            top: 0,
            height: 0,
            width: 0,
            glyphs: config.glyphs,
            pending: None,
            confirm: None,
            dispatching: None,
            prompt: None,
            details: None,
            help: false,
            reselect: None,
            refresh_deferred: false,
            status: None,
            exiting: false,
            effects: Vec::new(),
        };
        navigator.ensure_rows();
        Ok(navigator)
    }

    pub fn phase(&self) -> Phase {
        if self.exiting {
            Phase::Exiting
        } else if let Some(request) = &self.confirm {
            Phase::ConfirmPending(request.clone())
        } else if self.dispatching.is_some() || self.view.in_flight() {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    /// Key map for the current state
    pub fn key_context(&self) -> KeyContext {
        if self.confirm.is_some() {
            KeyContext::Confirm
        } else if self.prompt.is_some() {
            KeyContext::Prompt
        } else if self.help {
            KeyContext::Help
        } else {
            KeyContext::Normal
        }
    }

    /// Effects queued since the last call
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn view(&self) -> &GenerationView {
        &self.view
    }

    pub fn generation(&self) -> Generation {
        self.view.generation()
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&GraphRow> {
        self.view.row(self.selected)
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Row indices inside the viewport that are materialized
    pub fn visible(&self) -> Range<usize> {
        let end = (self.top + self.height).min(self.view.len());
        self.top.min(end)..end
    }

    pub fn glyphs(&self) -> GlyphSet {
        self.glyphs
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn details(&self) -> Option<&DetailsPane> {
        self.details.as_ref()
    }

    pub fn help_visible(&self) -> bool {
        self.help
    }

    pub fn dispatching(&self) -> Option<&MutationRequest> {
        self.dispatching.as_ref()
    }

    /// Resize the viewport; may request more rows
    pub fn set_viewport(&mut self, height: usize, width: usize) {
        if self.height == height && self.width == width {
            return;
        }
        self.height = height;
        self.width = width;
        self.scroll_to_selection();
        self.ensure_rows();
    }

    /// Handle one user input
    pub fn handle(&mut self, input: Input) {
        if self.exiting {
            return;
        }

        if let Some(request) = &self.dispatching {
            // Mutations cannot be interrupted; input waits for the result
            if input == Input::Command(Command::Quit) {
                let text = format!("Waiting for {} to finish", request.kind().label());
                self.set_status(StatusKind::Info, text);
            }
            return;
        }

        if self.confirm.is_some() {
            self.handle_confirm(input);
        } else if self.prompt.is_some() {
            self.handle_prompt(input);
        } else if self.help {
            if input == Input::Command(Command::Quit) {
                self.exiting = true;
            }
            self.help = false;
        } else {
            match input {
                Input::Command(command) => {
                    self.status = None;
                    self.run_command(command);
                }
                Input::Cancel => {
                    if self.details.take().is_none() {
                        self.status = None;
                    }
                }
                _ => {}
            }
        }
        self.flush_deferred_refresh();
    }

    /// Handle a result posted by a background task
    pub fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Batch {
                generation,
                offset,
                result,
            } => self.on_batch(generation, offset, result),
            WorkerMessage::ActionFinished { request, result } => {
                self.on_action_finished(request, result)
            }
            WorkerMessage::Details {
                generation,
                id,
                result,
            } => self.on_details(generation, id, result),
            WorkerMessage::RepositoryChanged => {
                if self.dispatching.is_some() || self.confirm.is_some() || self.prompt.is_some() {
                    debug!("repository changed, refresh deferred");
                    self.refresh_deferred = true;
                } else {
                    info!("repository changed, refreshing");
                    self.refresh();
                }
            }
        }
        self.flush_deferred_refresh();
    }

    /// Validate `params` and switch to a new generation built from them.
    ///
    /// On error nothing changes.
    pub fn apply_filter(&mut self, params: FilterParams) -> Result<()> {
        let source = FilterEngine::build(&params, Utc::now())?;
        self.switch_generation(params, source, None)
    }

    fn run_command(&mut self, command: Command) {
        let page = self.height.max(1);
        match command {
            Command::MoveUp => self.select(self.selected.saturating_sub(1)),
            Command::MoveDown => self.move_to(self.selected + 1),
            Command::PageUp => self.select(self.selected.saturating_sub(page)),
            Command::PageDown => self.move_to(self.selected + page),
            Command::Top => self.select(0),
            Command::Bottom => self.move_to_end(),
            Command::JumpToParent => self.jump_to_parent(),
            Command::JumpToChild => self.jump_to_child(),
            Command::OpenDetails => {
                if self.details.take().is_none() {
                    self.open_details();
                }
            }
            Command::Checkout => self.invoke_action(ActionKind::Checkout, None),
            Command::Reset => self.invoke_action(ActionKind::Reset, None),
            Command::CherryPick => self.invoke_action(ActionKind::CherryPick, None),
            Command::Revert => self.invoke_action(ActionKind::Revert, None),
            Command::NewBranch => self.open_prompt(PromptKind::BranchName, String::new()),
            Command::NewTag => self.open_prompt(PromptKind::TagName, String::new()),
            Command::StartFilter => self.open_prompt(PromptKind::Filter, to_query(&self.params)),
            Command::ToggleFollow => self.toggle_follow(),
            Command::ToggleUnicode => {
                self.glyphs = self.glyphs.toggled();
                let name = match self.glyphs {
                    GlyphSet::Ascii => "ASCII",
                    GlyphSet::Unicode => "Unicode",
                };
                self.set_status(StatusKind::Info, format!("{} glyphs", name));
            }
            Command::Help => self.help = true,
            Command::Quit => self.exiting = true,
        }
    }

    // Selection and materialization

    fn select(&mut self, index: usize) {
        self.pending = None;
        self.selected = index.min(self.view.len().saturating_sub(1));
        self.scroll_to_selection();
        self.sync_details();
        self.ensure_rows();
    }

    /// Select `index`, loading rows first if it is past the materialized end
    fn move_to(&mut self, index: usize) {
        if index < self.view.len() || self.view.is_exhausted() {
            self.select(index);
            return;
        }
        self.pending = Some(Pending::Row(index));
        self.request_rows(index + 1 + self.config.read_ahead - self.view.len());
    }

    fn move_to_end(&mut self) {
        if self.view.is_exhausted() {
            self.select(usize::MAX);
            return;
        }
        self.pending = Some(Pending::End);
        self.request_rows(self.config.batch_size);
    }

    fn scroll_to_selection(&mut self) {
        if self.selected < self.top {
            self.top = self.selected;
        } else if self.height > 0 && self.selected >= self.top + self.height {
            self.top = self.selected + 1 - self.height;
        }
    }

    /// Pull enough rows to fill the viewport plus read-ahead
    fn ensure_rows(&mut self) {
        let wanted = self.top + self.height + self.config.read_ahead;
        if self.view.len() < wanted {
            self.request_rows(wanted - self.view.len());
        }
    }

    fn request_rows(&mut self, count: usize) {
        if let Some(effect) = self.view.next_pull(count) {
            self.effects.push(effect);
        }
    }

    fn resolve_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let len = self.view.len();
        let exhausted = self.view.is_exhausted();
        match pending {
            Pending::Row(index) if index < len || exhausted => self.select(index),
            Pending::Row(index) => {
                self.pending = Some(Pending::Row(index));
                self.request_rows(index + 1 + self.config.read_ahead - len);
            }
            Pending::End if exhausted => self.select(usize::MAX),
            Pending::End => {
                self.pending = Some(Pending::End);
                self.request_rows(self.config.batch_size);
            }
            Pending::Commit(id) => {
                if let Some(index) = self.view.index_of(&id) {
                    self.select(index);
                } else if exhausted {
                    self.set_status(
                        StatusKind::Info,
                        format!("{} is outside the loaded history", abbreviate(&id)),
                    );
                } else {
                    self.pending = Some(Pending::Commit(id));
                    self.request_rows(self.config.batch_size);
                }
            }
        }
    }

    fn jump_to_parent(&mut self) {
        let Some(record) = self.selected_row().map(|row| Arc::clone(&row.record)) else {
            return;
        };
        let Some(parent) = record.parents.first() else {
            self.set_status(
                StatusKind::Info,
                format!("{} is a root commit", record.short_id),
            );
            return;
        };
        if let Some(index) = self.view.index_of(parent) {
            self.select(index);
        } else if self.view.is_exhausted() {
            self.set_status(
                StatusKind::Info,
                format!("{} is outside the loaded history", abbreviate(parent)),
            );
        } else {
            self.pending = Some(Pending::Commit(parent.clone()));
            self.request_rows(self.config.batch_size);
        }
    }

    /// Children always come earlier in the stream; pick the nearest one
    fn jump_to_child(&mut self) {
        let Some(record) = self.selected_row().map(|row| Arc::clone(&row.record)) else {
            return;
        };
        match self.view.children_of(&record.id).iter().max().copied() {
            Some(index) => self.select(index),
            None => self.set_status(
                StatusKind::Info,
                format!("{} has no child in this view", record.short_id),
            ),
        }
    }

    // Details pane

    fn open_details(&mut self) {
        let Some(record) = self.selected_row().map(|row| Arc::clone(&row.record)) else {
            self.set_status(StatusKind::Info, "No commit selected");
            return;
        };
        self.load_details(record);
    }

    fn sync_details(&mut self) {
        let Some(pane) = &self.details else {
            return;
        };
        let Some(record) = self.selected_row().map(|row| Arc::clone(&row.record)) else {
            return;
        };
        if pane.record.id != record.id || pane.generation != self.view.generation() {
            self.load_details(record);
        }
    }

    fn load_details(&mut self, record: Arc<CommitRecord>) {
        let generation = self.view.generation();
        self.effects.push(Effect::LoadDetails {
            generation,
            source: Arc::clone(self.view.source()),
            id: record.id.clone(),
        });
        self.details = Some(DetailsPane {
            record,
            generation,
            details: None,
            error: None,
        });
    }

    // Prompts and filters

    fn open_prompt(&mut self, kind: PromptKind, input: String) {
        if kind != PromptKind::Filter && self.selected_row().is_none() {
            self.set_status(StatusKind::Info, "No commit selected");
            return;
        }
        self.prompt = Some(Prompt { kind, input });
    }

    fn handle_prompt(&mut self, input: Input) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match input {
            Input::Char(c) => prompt.input.push(c),
            Input::Backspace => {
                prompt.input.pop();
            }
            Input::Cancel => self.prompt = None,
            Input::Submit => self.submit_prompt(),
            _ => {}
        }
    }

    /// Invalid input keeps the prompt open so it can be corrected
    fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        match prompt.kind {
            PromptKind::Filter => {
                let result = parse_query(&prompt.input).and_then(|params| self.apply_filter(params));
                if let Err(e) = result {
                    self.set_status(StatusKind::Error, e.to_string());
                    self.prompt = Some(prompt);
                }
            }
            PromptKind::BranchName | PromptKind::TagName => {
                match validate_ref_name(prompt.input.trim()).map(str::to_string) {
                    Ok(name) => {
                        let kind = if prompt.kind == PromptKind::BranchName {
                            ActionKind::NewBranch
                        } else {
                            ActionKind::NewTag
                        };
                        self.invoke_action(kind, Some(name));
                    }
                    Err(e) => {
                        self.set_status(StatusKind::Error, e.to_string());
                        self.prompt = Some(prompt);
                    }
                }
            }
        }
    }

    fn toggle_follow(&mut self) {
        if self.params.paths.len() != 1 {
            self.set_status(StatusKind::Error, "Follow needs exactly one path filter");
            return;
        }
        let mut params = self.params.clone();
        params.follow = !params.follow;
        let following = params.follow;
        match self.apply_filter(params) {
            Ok(()) if following => self.set_status(StatusKind::Info, "Following renames"),
            Ok(()) => self.set_status(StatusKind::Info, "Not following renames"),
            Err(e) => self.set_status(StatusKind::Error, e.to_string()),
        }
    }

    // Actions

    fn invoke_action(&mut self, kind: ActionKind, name: Option<String>) {
        let Some(record) = self.selected_row().map(|row| Arc::clone(&row.record)) else {
            self.set_status(StatusKind::Info, "No commit selected");
            return;
        };
        if record.is_merge() && matches!(kind, ActionKind::CherryPick | ActionKind::Revert) {
            self.set_status(
                StatusKind::Error,
                format!("Cannot {} merge commit {}", kind.label(), record.short_id),
            );
            return;
        }
        let Some(request) = MutationRequest::for_action(kind, record.id.clone(), name) else {
            return;
        };
        if kind.is_destructive() && self.config.confirm_dangerous {
            debug!(request = %request.describe(), "awaiting confirmation");
            self.confirm = Some(request);
            return;
        }
        self.dispatch(request);
    }

    fn handle_confirm(&mut self, input: Input) {
        match input {
            Input::Confirm => {
                if let Some(request) = self.confirm.take() {
                    self.dispatch(request);
                }
            }
            Input::Cancel => {
                self.confirm = None;
                self.set_status(StatusKind::Info, "Cancelled");
            }
            Input::Command(Command::Quit) => {
                self.confirm = None;
                self.exiting = true;
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, request: MutationRequest) {
        info!(request = %request.describe(), "dispatching");
        self.set_status(StatusKind::Info, format!("Running {}...", request.describe()));
        self.dispatching = Some(request.clone());
        self.effects.push(Effect::Dispatch(request));
    }

    fn on_action_finished(&mut self, request: MutationRequest, result: Result<()>) {
        self.dispatching = None;
        match result {
            Ok(()) => {
                info!(request = %request.describe(), "action finished");
                self.refresh();
                self.set_status(StatusKind::Info, format!("Done: {}", request.describe()));
            }
            Err(e) => {
                warn!(request = %request.describe(), "action failed: {}", e);
                self.set_status(
                    StatusKind::Error,
                    format!("{} failed: {}", request.kind().label(), e),
                );
            }
        }
    }

    // Generations

    fn on_batch(&mut self, generation: Generation, offset: usize, result: Result<Batch>) {
        if generation != self.view.generation() {
            debug!(%generation, current = %self.view.generation(), "discarding stale batch");
            return;
        }
        match result {
            Ok(batch) => {
                if !self.view.apply(offset, batch) {
                    return;
                }
                if let Some(id) = self.reselect.take() {
                    if let Some(index) = self.view.index_of(&id) {
                        self.selected = index;
                        self.scroll_to_selection();
                    }
                }
                self.resolve_pending();
                self.sync_details();
                self.ensure_rows();
            }
            Err(e) => {
                warn!(%generation, "pull failed: {}", e);
                self.view.pull_failed();
                self.pending = None;
                self.set_status(StatusKind::Error, format!("Failed to load history: {}", e));
            }
        }
    }

    fn on_details(&mut self, generation: Generation, id: CommitId, result: Result<CommitDetails>) {
        let Some(pane) = self.details.as_mut() else {
            return;
        };
        if pane.generation != generation || pane.record.id != id {
            debug!(%generation, id = %id, "discarding stale details");
            return;
        }
        match result {
            Ok(details) => pane.details = Some(details),
            Err(e) => pane.error = Some(e.to_string()),
        }
    }

    /// Rebuild the current generation, keeping the selected commit
    fn refresh(&mut self) {
        self.refresh_deferred = false;
        let reselect = self.selected_row().map(|row| row.record.id.clone());
        let params = self.params.clone();
        let source = self.view.source_config().clone();
        if let Err(e) = self.switch_generation(params, source, reselect) {
            self.set_status(StatusKind::Error, format!("Refresh failed: {}", e));
        }
    }

    fn flush_deferred_refresh(&mut self) {
        if self.refresh_deferred
            && self.dispatching.is_none()
            && self.confirm.is_none()
            && self.prompt.is_none()
        {
            self.refresh();
        }
    }

    fn switch_generation(
        &mut self,
        params: FilterParams,
        source: SourceConfig,
        reselect: Option<CommitId>,
    ) -> Result<()> {
        let generation = self.view.generation().next();
        let commit_source = self.factory.create(&source)?;
        info!(%generation, ?params, "starting generation");

        self.view = GenerationView::new(generation, commit_source, source);
        self.params = params;
        self.selected = 0;
        self.top = 0;
        self.pending = None;
        self.reselect = reselect;
        self.ensure_rows();
        Ok(())
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(Status {
            kind,
            text: text.into(),
        });
    }
}
