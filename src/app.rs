//! The session engine.
//!
//! [`AppState`] owns the record store, the ordered list, the page loader, the
//! stats loader, selection state and every piece of transient UI state. It
//! never performs I/O: event handlers mutate state and return the
//! [`Command`]s the runtime must execute. Their results come back later as
//! [`AppEvent`]s on the same single-threaded loop.

use crate::api::ApiResult;
use crate::events::AppEvent;
use crate::input::{self, Action, InputContext};
use crate::live::{ChannelEvent, ChannelState};
use crate::model::{AnalysisResult, DashboardStatistics, Record, RecordSummary};
use crate::pager::{PageLoader, PageOutcome, PageRequest};
use crate::parser;
use crate::selection::{reconcile_initial_selection, Reconciled, Section, SelectionState, Theme};
use crate::stats::{StatsLoader, StatsOutcome, StatsRequest};
use crate::store::{DetailFetch, RecordStore};
use crate::view::{project, Filter, Projection, RecordOrder};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const NOTIFICATION_TTL_SECS: u64 = 5;
/// Must match the length of `BRAILLE_FRAMES` in `tui::spinner`.
pub const SPINNER_FRAME_COUNT: usize = 10;
/// Below 60 cols the key hints and the detail pane don't fit.
pub const NARROW_WIDTH_THRESHOLD: u16 = 60;
/// Moving within this many rows of the end of the list loads the next page.
pub const SCROLL_PREFETCH_ROWS: usize = 5;
pub const PAGE_JUMP_ROWS: usize = 10;
/// Toasts kept at once; older ones are dropped first.
pub const MAX_NOTIFICATIONS: usize = 5;

/// Side effects requested by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchPage(PageRequest),
    FetchDetail(String),
    FetchStats(StatsRequest),
    SubmitFeedback { analysis_id: String, correct: bool },
    DeleteAll,
    CreateDemo,
    NotifyDesktop(RecordSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub timestamp: Instant,
}

/// What the detail pane shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailPanel {
    /// Nothing selected yet, or nothing to select.
    #[default]
    Placeholder,
    Loading(String),
    Ready(String),
    /// The record no longer exists on the server.
    NotFound(String),
    Failed { id: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    Submitting(bool),
    Submitted(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteAll,
}

#[derive(Debug, Clone)]
pub struct ConfirmOverlay {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Immutable configuration set at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: String,
    pub page_size: u32,
    pub reconnect_delay: Duration,
    pub version_string: String,
}

pub struct AppState {
    pub config: AppConfig,

    // Data
    pub store: RecordStore,
    pub order: RecordOrder,
    pub pager: PageLoader,
    pub stats: StatsLoader,

    // View
    pub filter: Filter,
    pub projection: Projection,
    pub cursor: usize,
    pub section: Section,
    pub theme: Theme,

    // Selection
    pub selected: Option<String>,
    pub detail: DetailPanel,
    pub analysis_cursor: usize,
    pub feedback: HashMap<String, FeedbackState>,
    selection: SelectionState,

    // Live channel
    pub channel: ChannelState,

    // Transient UI
    pub notifications: Vec<Notification>,
    pub confirm: Option<ConfirmOverlay>,
    pub input_mode: InputMode,
    pub admin_busy: bool,
    pub spinner_frame: usize,
    pub should_quit: bool,

    // Desktop notifications
    pub desktop_notify: bool,
}

impl AppState {
    pub fn new(config: AppConfig, selection: SelectionState) -> Self {
        let pager = PageLoader::new(config.page_size);
        let section = selection.active_section();
        let theme = selection.theme();
        Self {
            config,
            store: RecordStore::new(),
            order: RecordOrder::new(),
            pager,
            stats: StatsLoader::new(),
            filter: Filter::default(),
            projection: Projection::NotLoaded,
            cursor: 0,
            section,
            theme,
            selected: None,
            detail: DetailPanel::Placeholder,
            analysis_cursor: 0,
            feedback: HashMap::new(),
            selection,
            channel: ChannelState::Disconnected,
            notifications: Vec::new(),
            confirm: None,
            input_mode: InputMode::Normal,
            admin_busy: false,
            spinner_frame: 0,
            should_quit: false,
            desktop_notify: true,
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Initial page and statistics. The persisted section was already
    /// restored in [`AppState::new`]; this single stats refresh also serves
    /// the statistics section if that is the one being restored.
    pub fn start(&mut self, now_millis: i64) -> Vec<Command> {
        let mut cmds = self.load_more();
        cmds.extend(self.refresh_stats(now_millis));
        cmds
    }

    pub fn handle(&mut self, event: AppEvent, now_millis: i64) -> Vec<Command> {
        match event {
            AppEvent::Key(key) => {
                let action = input::map_key(key, &self.input_context());
                self.apply_action(action, now_millis)
            }
            AppEvent::Tick => {
                if self.is_loading() {
                    self.advance_spinner();
                }
                self.prune_notifications();
                Vec::new()
            }
            AppEvent::PageLoaded { request, result } => {
                let outcome = self.pager.complete(request, result);
                self.on_page(outcome)
            }
            AppEvent::DetailLoaded { id, result } => self.on_detail(&id, result),
            AppEvent::StatsLoaded(result) => self.on_stats(result, now_millis),
            AppEvent::FeedbackSubmitted {
                analysis_id,
                correct,
                result,
            } => {
                self.on_feedback(&analysis_id, correct, result);
                Vec::new()
            }
            AppEvent::AllDeleted(result) => self.on_all_deleted(result, now_millis),
            AppEvent::DemoCreated(result) => self.on_demo_created(result, now_millis),
            AppEvent::Channel(event) => self.on_channel(event, now_millis),
            AppEvent::Error(message) => {
                self.notify(NotificationLevel::Error, message);
                Vec::new()
            }
        }
    }

    pub fn input_context(&self) -> InputContext {
        InputContext {
            has_notification: !self.notifications.is_empty(),
            confirming: self.confirm.is_some(),
            searching: self.input_mode == InputMode::Search,
        }
    }

    pub fn apply_action(&mut self, action: Action, now_millis: i64) -> Vec<Command> {
        match action {
            Action::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Action::DismissNotification => {
                self.notifications.pop();
                Vec::new()
            }
            Action::MoveUp => {
                self.move_cursor_up(1);
                Vec::new()
            }
            Action::PageUp => {
                self.move_cursor_up(PAGE_JUMP_ROWS);
                Vec::new()
            }
            Action::MoveDown => self.move_cursor_down(1),
            Action::PageDown => self.move_cursor_down(PAGE_JUMP_ROWS),
            Action::Select => match self.current_row_id().map(str::to_string) {
                Some(id) => self.select(&id),
                None => Vec::new(),
            },
            Action::SwitchSection => self.switch_section(self.section.other(), now_millis),
            Action::CycleFilter => {
                let mut filter = self.filter.clone();
                filter.status = filter.status.cycle();
                self.apply_filter(filter);
                Vec::new()
            }
            Action::StartSearch => {
                self.input_mode = InputMode::Search;
                Vec::new()
            }
            Action::SearchInput(c) => {
                let mut filter = self.filter.clone();
                filter.search.push(c);
                self.apply_filter(filter);
                Vec::new()
            }
            Action::SearchBackspace => {
                let mut filter = self.filter.clone();
                filter.search.pop();
                self.apply_filter(filter);
                Vec::new()
            }
            Action::FinishSearch => {
                self.input_mode = InputMode::Normal;
                Vec::new()
            }
            Action::CancelSearch => {
                self.input_mode = InputMode::Normal;
                let mut filter = self.filter.clone();
                filter.search.clear();
                self.apply_filter(filter);
                Vec::new()
            }
            Action::RefreshStats => self.refresh_stats(now_millis),
            Action::NextAnalysis => {
                let count = self.selected_analyses().len();
                if self.analysis_cursor + 1 < count {
                    self.analysis_cursor += 1;
                }
                Vec::new()
            }
            Action::PrevAnalysis => {
                self.analysis_cursor = self.analysis_cursor.saturating_sub(1);
                Vec::new()
            }
            Action::Feedback(correct) => self.submit_feedback(correct),
            Action::CreateDemo => self.create_demo(),
            Action::DeleteAll => {
                self.open_confirm(
                    "Delete all runs".to_string(),
                    "Remove every test run from the server?".to_string(),
                    ConfirmAction::DeleteAll,
                );
                Vec::new()
            }
            Action::Confirm => self.accept_confirm(),
            Action::Cancel => {
                self.confirm = None;
                Vec::new()
            }
            Action::ToggleTheme => {
                self.toggle_theme();
                Vec::new()
            }
            Action::None => Vec::new(),
        }
    }

    // --- Page loading ---

    /// Requests the next page unless one is in flight or the list is
    /// exhausted.
    pub fn load_more(&mut self) -> Vec<Command> {
        self.pager.load_next().map(Command::FetchPage).into_iter().collect()
    }

    fn on_page(&mut self, outcome: PageOutcome) -> Vec<Command> {
        match outcome {
            PageOutcome::Applied { records, initial } => {
                tracing::debug!(count = records.len(), initial, "page applied");
                for summary in records {
                    let id = summary.id.clone();
                    self.store.put(Record::summary_only(summary));
                    self.order.append_if_absent(&id);
                }
                self.reproject();
                if initial {
                    self.reconcile_selection()
                } else {
                    Vec::new()
                }
            }
            PageOutcome::Failed(e) => {
                self.notify(NotificationLevel::Error, format!("Failed to load runs: {e}"));
                Vec::new()
            }
            PageOutcome::Stale => Vec::new(),
        }
    }

    fn reconcile_selection(&mut self) -> Vec<Command> {
        match reconcile_initial_selection(self.selection.selected_record(), self.order.ids()) {
            Reconciled::Focus(id) => self.select(&id),
            Reconciled::Placeholder => {
                self.selected = None;
                self.detail = DetailPanel::Placeholder;
                Vec::new()
            }
        }
    }

    // --- Selection & detail ---

    /// Focuses a record: persists the choice and shows its detail, fetching it
    /// at most once.
    pub fn select(&mut self, id: &str) -> Vec<Command> {
        if self.selected.as_deref() != Some(id) {
            self.analysis_cursor = 0;
        }
        self.selected = Some(id.to_string());
        if let Some(pos) = self.projection.position(id) {
            self.cursor = pos;
        }
        if let Err(e) = self.selection.persist_selection(id) {
            tracing::warn!("failed to persist selection: {e}");
        }
        match self.store.begin_detail_fetch(id) {
            DetailFetch::Cached => {
                self.detail = DetailPanel::Ready(id.to_string());
                Vec::new()
            }
            DetailFetch::Pending => {
                self.detail = DetailPanel::Loading(id.to_string());
                Vec::new()
            }
            DetailFetch::Issue => {
                self.detail = DetailPanel::Loading(id.to_string());
                vec![Command::FetchDetail(id.to_string())]
            }
        }
    }

    fn on_detail(&mut self, id: &str, result: ApiResult<Record>) -> Vec<Command> {
        let settled = self.store.finish_detail_fetch(id, result);
        if self.selected.as_deref() != Some(id) {
            return Vec::new();
        }
        if self.store.has_detail(id) {
            self.detail = DetailPanel::Ready(id.to_string());
            return Vec::new();
        }
        let Some(outcome) = settled else {
            // Issued before a reload; whoever waits on it needs a fresh one.
            if self.detail == DetailPanel::Loading(id.to_string()) {
                return self.select(id);
            }
            return Vec::new();
        };
        match outcome {
            Ok(_) => self.detail = DetailPanel::Ready(id.to_string()),
            Err(e) if e.is_not_found() => self.detail = DetailPanel::NotFound(id.to_string()),
            Err(e) => {
                self.notify(NotificationLevel::Error, format!("Failed to load run details: {e}"));
                self.detail = DetailPanel::Failed {
                    id: id.to_string(),
                    message: e.to_string(),
                };
            }
        }
        Vec::new()
    }

    pub fn selected_record(&self) -> Option<&Record> {
        match &self.detail {
            DetailPanel::Ready(id) => self.store.get(id),
            _ => None,
        }
    }

    pub fn selected_analyses(&self) -> &[AnalysisResult] {
        self.selected_record()
            .and_then(|r| r.detail.as_ref())
            .map(|d| d.analysis_results.as_slice())
            .unwrap_or_default()
    }

    pub fn current_analysis(&self) -> Option<&AnalysisResult> {
        self.selected_analyses().get(self.analysis_cursor)
    }

    // --- View projection ---

    pub fn apply_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.reproject();
    }

    /// Recomputes the visible rows, keeping the cursor on the same record when
    /// it is still visible.
    fn reproject(&mut self) {
        let anchor = self.current_row_id().map(str::to_string);
        let loaded = self.pager.has_loaded() || !self.order.is_empty();
        self.projection = project(&self.order, &self.store, &self.filter, loaded);
        self.cursor = anchor
            .and_then(|id| self.projection.position(&id))
            .unwrap_or_else(|| self.cursor.min(self.projection.len().saturating_sub(1)));
    }

    pub fn current_row_id(&self) -> Option<&str> {
        self.projection.rows().get(self.cursor).map(String::as_str)
    }

    pub fn move_cursor_up(&mut self, rows: usize) {
        self.cursor = self.cursor.saturating_sub(rows);
    }

    /// Moves down and pulls the next page in once the cursor nears the end.
    /// With nothing visible (a failed first page, or a filter hiding every
    /// loaded row) it still asks for the next page.
    pub fn move_cursor_down(&mut self, rows: usize) -> Vec<Command> {
        let len = self.projection.len();
        if len == 0 {
            return self.load_more();
        }
        self.cursor = (self.cursor + rows).min(len - 1);
        if self.cursor + SCROLL_PREFETCH_ROWS >= len {
            self.load_more()
        } else {
            Vec::new()
        }
    }

    // --- Live updates ---

    fn on_channel(&mut self, event: ChannelEvent, now_millis: i64) -> Vec<Command> {
        match event {
            ChannelEvent::Connecting => {
                self.channel = ChannelState::Connecting;
                Vec::new()
            }
            ChannelEvent::Connected => {
                self.channel = ChannelState::Connected;
                self.notify(NotificationLevel::Success, "Live updates connected".to_string());
                Vec::new()
            }
            ChannelEvent::Disconnected { reason } => {
                let was_connected = self.channel == ChannelState::Connected;
                self.channel = ChannelState::Disconnected;
                if was_connected {
                    self.notify(
                        NotificationLevel::Error,
                        format!(
                            "Live updates disconnected ({reason}), retrying in {}s",
                            self.config.reconnect_delay.as_secs()
                        ),
                    );
                }
                Vec::new()
            }
            ChannelEvent::Message(body) => self.on_push(&body, now_millis),
        }
    }

    /// A pushed record: cached with full detail, prepended if not listed yet,
    /// and announced.
    pub fn on_push(&mut self, body: &str, now_millis: i64) -> Vec<Command> {
        let record = match parser::parse_record(body) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("ignoring undecodable push: {e}");
                self.notify(NotificationLevel::Error, format!("Ignored malformed update: {e}"));
                return Vec::new();
            }
        };
        let summary = record.summary.clone();
        let mut cmds = self.ingest_new_record(record, now_millis);
        self.notify(
            NotificationLevel::Info,
            format!("New test run: {}", summary.method_label()),
        );
        if self.desktop_notify && summary.status.is_failure() {
            cmds.push(Command::NotifyDesktop(summary));
        }
        cmds
    }

    fn ingest_new_record(&mut self, record: Record, now_millis: i64) -> Vec<Command> {
        let id = record.id().to_string();
        self.store.put(record);
        self.order.prepend_if_absent(&id);
        self.reproject();
        if self.store.has_detail(&id) && self.detail == DetailPanel::Loading(id.clone()) {
            self.detail = DetailPanel::Ready(id);
        }
        self.refresh_stats(now_millis)
    }

    // --- Statistics ---

    pub fn refresh_stats(&mut self, now_millis: i64) -> Vec<Command> {
        self.stats.refresh(now_millis).map(Command::FetchStats).into_iter().collect()
    }

    fn on_stats(&mut self, result: ApiResult<DashboardStatistics>, now_millis: i64) -> Vec<Command> {
        match self.stats.complete(result) {
            StatsOutcome::Updated => {}
            StatsOutcome::FailedInline(e) | StatsOutcome::FailedKeptLastGood(e) => {
                self.notify(NotificationLevel::Error, format!("Failed to load statistics: {e}"));
            }
        }
        self.stats.take_follow_up(now_millis).map(Command::FetchStats).into_iter().collect()
    }

    // --- Sections & theme ---

    pub fn switch_section(&mut self, section: Section, now_millis: i64) -> Vec<Command> {
        self.section = section;
        if let Err(e) = self.selection.persist_active_section(section) {
            tracing::warn!("failed to persist active section: {e}");
        }
        if section == Section::Statistics {
            self.refresh_stats(now_millis)
        } else {
            Vec::new()
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
        if let Err(e) = self.selection.persist_theme(self.theme) {
            tracing::warn!("failed to persist theme: {e}");
        }
    }

    // --- Feedback ---

    /// Votes on the highlighted analysis of the selected record. A vote that is
    /// in flight or already accepted ignores further presses.
    pub fn submit_feedback(&mut self, correct: bool) -> Vec<Command> {
        let Some(analysis_id) = self.current_analysis().map(|a| a.id.clone()) else {
            return Vec::new();
        };
        if self.feedback.contains_key(&analysis_id) {
            return Vec::new();
        }
        self.feedback
            .insert(analysis_id.clone(), FeedbackState::Submitting(correct));
        vec![Command::SubmitFeedback {
            analysis_id,
            correct,
        }]
    }

    fn on_feedback(&mut self, analysis_id: &str, correct: bool, result: ApiResult<()>) {
        match result {
            Ok(()) => {
                self.feedback
                    .insert(analysis_id.to_string(), FeedbackState::Submitted(correct));
                self.notify(NotificationLevel::Success, "Thanks for the feedback".to_string());
            }
            Err(e) => {
                self.feedback.remove(analysis_id);
                self.notify(NotificationLevel::Error, format!("Feedback not sent: {e}"));
            }
        }
    }

    // --- Administrative actions ---

    pub fn create_demo(&mut self) -> Vec<Command> {
        if self.admin_busy {
            return Vec::new();
        }
        self.admin_busy = true;
        vec![Command::CreateDemo]
    }

    fn on_demo_created(&mut self, result: ApiResult<Record>, now_millis: i64) -> Vec<Command> {
        self.admin_busy = false;
        match result {
            Ok(record) => {
                let id = record.id().to_string();
                let mut cmds = self.ingest_new_record(record, now_millis);
                cmds.extend(self.select(&id));
                self.notify(NotificationLevel::Success, "Demo run created".to_string());
                cmds
            }
            Err(e) => {
                self.notify(NotificationLevel::Error, format!("Demo creation failed: {e}"));
                Vec::new()
            }
        }
    }

    pub fn open_confirm(&mut self, title: String, message: String, action: ConfirmAction) {
        self.confirm = Some(ConfirmOverlay {
            title,
            message,
            action,
        });
    }

    fn accept_confirm(&mut self) -> Vec<Command> {
        match self.confirm.take().map(|c| c.action) {
            Some(ConfirmAction::DeleteAll) if !self.admin_busy => {
                self.admin_busy = true;
                vec![Command::DeleteAll]
            }
            _ => Vec::new(),
        }
    }

    fn on_all_deleted(&mut self, result: ApiResult<()>, now_millis: i64) -> Vec<Command> {
        self.admin_busy = false;
        match result {
            Ok(()) => {
                self.reset();
                self.notify(NotificationLevel::Success, "All runs deleted".to_string());
                let mut cmds = self.load_more();
                cmds.extend(self.refresh_stats(now_millis));
                cmds
            }
            Err(e) => {
                self.notify(NotificationLevel::Error, format!("Delete failed: {e}"));
                Vec::new()
            }
        }
    }

    /// Full reload: forget every record and start paging from the top under a
    /// new loader generation.
    fn reset(&mut self) {
        self.store.clear();
        self.order.clear();
        self.pager.reset();
        self.stats.reset();
        self.feedback.clear();
        self.selected = None;
        self.detail = DetailPanel::Placeholder;
        self.analysis_cursor = 0;
        self.cursor = 0;
        self.projection = Projection::NotLoaded;
    }

    // --- Transient UI ---

    pub fn is_loading(&self) -> bool {
        self.pager.is_loading()
            || self.stats.is_loading()
            || self.admin_busy
            || matches!(self.detail, DetailPanel::Loading(_))
    }

    pub fn notify(&mut self, level: NotificationLevel, message: String) {
        if self.notifications.len() >= MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
        self.notifications.push(Notification {
            level,
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn prune_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp).as_secs() < NOTIFICATION_TTL_SECS);
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }
}
