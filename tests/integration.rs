
use fixtures::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use xow::app::{AppConfig, AppState, Command, DetailPanel, FeedbackState, NotificationLevel};
use xow::events::AppEvent;
use xow::live::{ChannelEvent, ChannelState};
use xow::runtime::Runtime;
use xow::selection::{
    FileStateStore, MemoryStateStore, PersistedState, Section, SelectionState,
    ACTIVE_SECTION_KEY, SELECTED_RECORD_KEY,
};
use xow::stats::StatsView;
use xow::view::Projection;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

const NOW: i64 = 1_717_236_000_000;

fn press(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    })
}

fn config(page_size: u32) -> AppConfig {
    AppConfig {
        server: "http://localhost:8080".to_string(),
        page_size,
        reconnect_delay: Duration::from_secs(5),
        version_string: "xow test".to_string(),
    }
}

/// Engine plus runtime wired to a fake server. Every command except desktop
/// notifications produces exactly one event, so `settle` knows when the
/// session is quiet.
struct Harness {
    state: AppState,
    runtime: Runtime,
    rx: mpsc::UnboundedReceiver<AppEvent>,
    pending: usize,
    clock: i64,
}

impl Harness {
    fn new(server: &FakeServer, page_size: u32, selection: SelectionState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = AppState::new(config(page_size), selection);
        state.desktop_notify = false;
        Self {
            state,
            runtime: Runtime::new(Arc::new(server.clone()), tx),
            rx,
            pending: 0,
            clock: NOW,
        }
    }

    fn with_memory(server: &FakeServer, page_size: u32, persisted: PersistedState) -> (Self, MemoryStateStore) {
        let backend = MemoryStateStore::with(persisted);
        let selection = SelectionState::new(Box::new(backend.clone()));
        (Self::new(server, page_size, selection), backend)
    }

    fn run(&mut self, commands: Vec<Command>) {
        self.pending += commands
            .iter()
            .filter(|c| !matches!(c, Command::NotifyDesktop(_)))
            .count();
        self.runtime.execute_all(commands);
    }

    fn start(&mut self) {
        let commands = self.state.start(self.clock);
        self.run(commands);
    }

    fn send(&mut self, event: AppEvent) {
        self.clock += 1;
        let commands = self.state.handle(event, self.clock);
        self.run(commands);
    }

    async fn settle(&mut self) {
        while self.pending > 0 {
            let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .expect("runtime should answer every command")
                .expect("channel open");
            self.pending -= 1;
            self.send(event);
        }
    }

    fn push(&mut self, body: String) {
        self.send(AppEvent::Channel(ChannelEvent::Message(body)));
    }

    fn rows(&self) -> Vec<String> {
        self.state.projection.rows().to_vec()
    }
}

// ========== Session start ==========

#[tokio::test]
async fn startup_loads_first_page_focuses_first_record_and_stats() {
    let server = FakeServer::with_records(5);
    let (mut h, backend) = Harness::with_memory(&server, 3, PersistedState::default());
    h.start();
    h.settle().await;

    assert_eq!(h.rows(), vec!["r00", "r01", "r02"]);
    assert_eq!(h.state.selected.as_deref(), Some("r00"));
    assert_eq!(h.state.detail, DetailPanel::Ready("r00".into()));
    assert!(matches!(h.state.stats.view(), StatsView::Ready(s) if s.total_runs == 5));
    assert_eq!(backend.snapshot().get(SELECTED_RECORD_KEY), Some("r00"));

    let server_state = server.lock();
    assert_eq!(server_state.page_calls, vec![(0, 3)]);
    assert_eq!(server_state.detail_calls, vec!["r00".to_string()]);
    assert_eq!(server_state.stats_calls.len(), 1);
}

#[tokio::test]
async fn empty_server_shows_placeholder() {
    let server = FakeServer::default();
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    assert_eq!(h.state.projection, Projection::NoResults);
    assert_eq!(h.state.detail, DetailPanel::Placeholder);
    assert!(h.state.selected.is_none());
}

#[tokio::test]
async fn persisted_selection_and_section_survive_restart() {
    let server = FakeServer::with_records(4);
    let path = std::env::temp_dir().join(format!("xow-it-{}-state.json", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let mut h = Harness::new(&server, 50, SelectionState::new(Box::new(FileStateStore::new(path.clone()))));
        h.start();
        h.settle().await;
        h.send(press(KeyCode::Down));
        h.send(press(KeyCode::Down));
        h.send(press(KeyCode::Enter));
        h.send(press(KeyCode::Tab));
        h.settle().await;
        assert_eq!(h.state.selected.as_deref(), Some("r02"));
        assert_eq!(h.state.section, Section::Statistics);
    }

    let mut h = Harness::new(&server, 50, SelectionState::new(Box::new(FileStateStore::new(path.clone()))));
    assert_eq!(h.state.section, Section::Statistics);
    h.start();
    h.settle().await;
    assert_eq!(h.state.selected.as_deref(), Some("r02"));
    assert_eq!(h.state.cursor, 2);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn unknown_persisted_section_falls_back_to_overview() {
    let server = FakeServer::with_records(1);
    let mut persisted = PersistedState::default();
    persisted.set(ACTIVE_SECTION_KEY, "dashboards");
    let (h, _) = Harness::with_memory(&server, 50, persisted);
    assert_eq!(h.state.section, Section::Overview);
}

// ========== Paging ==========

#[tokio::test]
async fn scrolling_to_the_end_pages_through_everything_once() {
    let server = FakeServer::with_records(7);
    let (mut h, _) = Harness::with_memory(&server, 3, PersistedState::default());
    h.start();
    h.settle().await;

    for _ in 0..10 {
        h.send(press(KeyCode::Char('j')));
        h.settle().await;
    }

    let expected: Vec<String> = (0..7).map(|i| format!("r{i:02}")).collect();
    assert_eq!(h.rows(), expected);
    assert_eq!(server.lock().page_calls, vec![(0, 3), (1, 3), (2, 3)]);
    assert!(h.state.pager.cursor().exhausted);
}

// ========== Live updates ==========

#[tokio::test]
async fn pushed_record_is_listed_first_and_needs_no_fetch() {
    let server = FakeServer::with_records(2);
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    h.push(record_json("live-1", "FAILED"));
    h.settle().await;

    assert_eq!(h.rows(), vec!["live-1", "r00", "r01"]);
    let toast = h.state.notifications.iter().any(|n| n.message.contains("test_live-1"));
    assert!(toast);

    h.send(press(KeyCode::Up));
    h.send(press(KeyCode::Enter));
    h.settle().await;
    assert_eq!(h.state.detail, DetailPanel::Ready("live-1".into()));
    assert!(!server.lock().detail_calls.contains(&"live-1".to_string()));

    let record = h.state.selected_record().unwrap();
    assert_eq!(record.summary.environment(), "staging");
    assert_eq!(record.detail.as_ref().unwrap().duration_millis, Some(1530));
}

#[tokio::test]
async fn push_burst_coalesces_stats_refreshes() {
    let server = FakeServer::with_records(1);
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;
    let before = server.lock().stats_calls.len();

    // All three arrive before the first refresh answers.
    h.push(record_json("p1", "PASSED"));
    h.push(record_json("p2", "PASSED"));
    h.push(record_json("p3", "PASSED"));
    h.settle().await;

    let calls = server.lock().stats_calls.clone();
    assert_eq!(calls.len() - before, 2);
    assert!(calls.windows(2).all(|w| w[0] < w[1]), "cache busters must increase: {calls:?}");
}

#[tokio::test]
async fn channel_state_is_reflected_and_drop_is_announced() {
    let server = FakeServer::default();
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.send(AppEvent::Channel(ChannelEvent::Connecting));
    h.send(AppEvent::Channel(ChannelEvent::Connected));
    assert_eq!(h.state.channel, ChannelState::Connected);
    h.send(AppEvent::Channel(ChannelEvent::Disconnected {
        reason: "connection closed by server".into(),
    }));
    assert_eq!(h.state.channel, ChannelState::Disconnected);
    let last = h.state.notifications.last().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
}

// ========== Filtering ==========

#[tokio::test]
async fn status_filter_and_search_only_hide_rows() {
    let server = FakeServer::with_records(6);
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    h.send(press(KeyCode::Char('f'))); // passed
    h.send(press(KeyCode::Char('f'))); // failed
    assert_eq!(h.rows(), vec!["r00", "r03"]);

    h.send(press(KeyCode::Char('/')));
    for c in "r03".chars() {
        h.send(press(KeyCode::Char(c)));
    }
    h.send(press(KeyCode::Enter));
    assert_eq!(h.rows(), vec!["r03"]);
    assert_eq!(h.state.order.len(), 6);

    h.send(press(KeyCode::Char('f'))); // skipped
    assert_eq!(h.state.projection, Projection::NoResults);
}

// ========== Feedback ==========

#[tokio::test]
async fn feedback_is_sent_once_per_analysis() {
    let server = FakeServer::with_records(1);
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    h.send(press(KeyCode::Char('+')));
    h.send(press(KeyCode::Char('-')));
    h.settle().await;
    h.send(press(KeyCode::Char('+')));
    h.settle().await;

    assert_eq!(server.lock().feedback, vec![("an-r00".to_string(), true)]);
    assert_eq!(h.state.feedback.get("an-r00"), Some(&FeedbackState::Submitted(true)));
}

#[tokio::test]
async fn failed_feedback_can_be_retried() {
    let server = FakeServer::with_records(1);
    server.lock().fail_feedback = true;
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    h.send(press(KeyCode::Char('-')));
    h.settle().await;
    assert!(h.state.feedback.is_empty());
    assert_eq!(h.state.notifications.last().unwrap().level, NotificationLevel::Error);

    server.lock().fail_feedback = false;
    h.send(press(KeyCode::Char('-')));
    h.settle().await;
    assert_eq!(server.lock().feedback, vec![("an-r00".to_string(), false)]);
}

// ========== Statistics ==========

#[tokio::test]
async fn stats_failure_keeps_last_good() {
    let server = FakeServer::with_records(3);
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    server.lock().fail_stats = true;
    h.send(press(KeyCode::Char('r')));
    h.settle().await;

    assert!(matches!(h.state.stats.view(), StatsView::Ready(s) if s.total_runs == 3));
    assert_eq!(h.state.notifications.last().unwrap().level, NotificationLevel::Error);
}

#[tokio::test]
async fn first_stats_failure_is_shown_inline() {
    let server = FakeServer::with_records(3);
    server.lock().fail_stats = true;
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    assert!(matches!(h.state.stats.view(), StatsView::Error(_)));
}

// ========== Administrative actions ==========

#[tokio::test]
async fn delete_all_then_demo_rebuilds_list() {
    let server = FakeServer::with_records(4);
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    h.send(press(KeyCode::Char('D')));
    assert!(h.state.confirm.is_some());
    h.send(press(KeyCode::Char('y')));
    h.settle().await;

    assert!(h.state.store.is_empty());
    assert_eq!(h.state.projection, Projection::NoResults);
    assert_eq!(h.state.detail, DetailPanel::Placeholder);
    assert!(matches!(h.state.stats.view(), StatsView::Ready(s) if s.total_runs == 0));

    h.send(press(KeyCode::Char('n')));
    h.settle().await;
    assert_eq!(h.rows(), vec!["demo-1"]);
    assert_eq!(h.state.selected.as_deref(), Some("demo-1"));
    assert_eq!(h.state.detail, DetailPanel::Ready("demo-1".into()));
    assert!(server.lock().detail_calls.iter().all(|id| id != "demo-1"));
}

#[tokio::test]
async fn deleted_record_shows_not_found() {
    let server = FakeServer::with_records(2);
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.start();
    h.settle().await;

    server.lock().records.retain(|r| r.id() != "r01");
    h.send(press(KeyCode::Down));
    h.send(press(KeyCode::Enter));
    h.settle().await;

    assert_eq!(h.state.detail, DetailPanel::NotFound("r01".into()));
    assert!(!h.state.store.has_detail("r01"));
}

// ========== Quit ==========

#[tokio::test]
async fn quit_key_sets_flag() {
    let server = FakeServer::default();
    let (mut h, _) = Harness::with_memory(&server, 50, PersistedState::default());
    h.send(press(KeyCode::Char('q')));
    assert!(h.state.should_quit);
}
