//! Durable selection, section and theme state.
//!
//! Values are plain strings under fixed keys so the file stays readable and
//! needs no versioning. Every user-driven change is written through at once.

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const SELECTED_RECORD_KEY: &str = "selectedRecordId";
pub const ACTIVE_SECTION_KEY: &str = "activeTabId";
pub const THEME_KEY: &str = "theme";

pub const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Overview,
    Statistics,
}

impl Section {
    pub fn id(self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Statistics => "widgets",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Overview => "Runs",
            Section::Statistics => "Statistics",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "overview" => Some(Section::Overview),
            "widgets" => Some(Section::Statistics),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Section::Overview => Section::Statistics,
            Section::Statistics => Section::Overview,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn id(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedState(BTreeMap<String, String>);

impl PersistedState {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn selected_record(&self) -> Option<&str> {
        self.get(SELECTED_RECORD_KEY).filter(|id| !id.is_empty())
    }

    pub fn theme(&self) -> Theme {
        self.get(THEME_KEY).and_then(Theme::from_id).unwrap_or_default()
    }
}

pub trait StateStore: Send {
    fn load(&self) -> Result<PersistedState>;
    fn save(&self, state: &PersistedState) -> Result<()>;
}

/// JSON object on disk, replaced atomically on every save.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<PersistedState> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(eyre!("Failed to read {}: {e}", self.path.display())),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable state file: {e}");
                Ok(PersistedState::default())
            }
        }
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| eyre!("Failed to create {}: {e}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(state)?;
        atomicwrites::AtomicFile::new(&self.path, atomicwrites::AllowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|e| eyre!("Failed to write {}: {e}", self.path.display()))?;
        Ok(())
    }
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// and inspect what the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<PersistedState>>,
}

impl MemoryStateStore {
    pub fn with(state: PersistedState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn snapshot(&self) -> PersistedState {
        self.inner
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<PersistedState> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| eyre!("state store lock poisoned"))?;
        *guard = state.clone();
        Ok(())
    }
}

/// Outcome of matching the persisted selection against the loaded list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Focus(String),
    /// Nothing loaded: show the "select a record" placeholder.
    Placeholder,
}

pub fn reconcile_initial_selection(persisted: Option<&str>, loaded: &[String]) -> Reconciled {
    if let Some(id) = persisted {
        if loaded.iter().any(|loaded_id| loaded_id == id) {
            return Reconciled::Focus(id.to_string());
        }
    }
    loaded
        .first()
        .map_or(Reconciled::Placeholder, |first| Reconciled::Focus(first.clone()))
}

pub fn reconcile_active_section(persisted: Option<&str>) -> Section {
    persisted.and_then(Section::from_id).unwrap_or_default()
}

/// Loaded persisted state plus the backend it is written through to.
pub struct SelectionState {
    backend: Box<dyn StateStore>,
    persisted: PersistedState,
}

impl SelectionState {
    pub fn new(backend: Box<dyn StateStore>) -> Self {
        let persisted = backend.load().unwrap_or_else(|e| {
            tracing::warn!("failed to load persisted state: {e}");
            PersistedState::default()
        });
        Self { backend, persisted }
    }

    pub fn selected_record(&self) -> Option<&str> {
        self.persisted.selected_record()
    }

    pub fn active_section(&self) -> Section {
        reconcile_active_section(self.persisted.get(ACTIVE_SECTION_KEY))
    }

    pub fn theme(&self) -> Theme {
        self.persisted.theme()
    }

    pub fn persist_selection(&mut self, id: &str) -> Result<()> {
        self.write(SELECTED_RECORD_KEY, id)
    }

    pub fn persist_active_section(&mut self, section: Section) -> Result<()> {
        self.write(ACTIVE_SECTION_KEY, section.id())
    }

    pub fn persist_theme(&mut self, theme: Theme) -> Result<()> {
        self.write(THEME_KEY, theme.id())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        if self.persisted.get(key) == Some(value) {
            return Ok(());
        }
        self.persisted.set(key, value);
        self.backend.save(&self.persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn persisted_id_present_is_focused() {
        assert_eq!(
            reconcile_initial_selection(Some("b"), &ids(&["a", "b"])),
            Reconciled::Focus("b".into())
        );
    }

    #[test]
    fn persisted_id_missing_falls_back_to_first() {
        assert_eq!(
            reconcile_initial_selection(Some("gone"), &ids(&["a", "b"])),
            Reconciled::Focus("a".into())
        );
        assert_eq!(
            reconcile_initial_selection(None, &ids(&["a"])),
            Reconciled::Focus("a".into())
        );
    }

    #[test]
    fn empty_list_is_placeholder() {
        assert_eq!(reconcile_initial_selection(Some("a"), &[]), Reconciled::Placeholder);
    }

    #[test]
    fn unknown_section_defaults_to_overview() {
        assert_eq!(reconcile_active_section(Some("widgets")), Section::Statistics);
        assert_eq!(reconcile_active_section(Some("charts")), Section::Overview);
        assert_eq!(reconcile_active_section(None), Section::Overview);
    }

    #[test]
    fn writes_go_through_to_backend() {
        let backend = MemoryStateStore::default();
        let mut selection = SelectionState::new(Box::new(backend.clone()));
        selection.persist_selection("r-7").unwrap();
        selection.persist_active_section(Section::Statistics).unwrap();
        selection.persist_theme(Theme::Light).unwrap();

        let saved = backend.snapshot();
        assert_eq!(saved.get(SELECTED_RECORD_KEY), Some("r-7"));
        assert_eq!(saved.get(ACTIVE_SECTION_KEY), Some("widgets"));
        assert_eq!(saved.get(THEME_KEY), Some("light"));
    }

    #[test]
    fn loads_existing_state() {
        let mut state = PersistedState::default();
        state.set(ACTIVE_SECTION_KEY, "widgets");
        state.set(THEME_KEY, "light");
        let selection = SelectionState::new(Box::new(MemoryStateStore::with(state)));
        assert_eq!(selection.active_section(), Section::Statistics);
        assert_eq!(selection.theme(), Theme::Light);
        assert_eq!(selection.selected_record(), None);
    }

    #[test]
    fn file_store_round_trips_and_tolerates_garbage() {
        let dir = std::env::temp_dir().join(format!("xow-state-test-{}", std::process::id()));
        let path = dir.join(STATE_FILE_NAME);
        let store = FileStateStore::new(path.clone());
        assert_eq!(store.load().unwrap(), PersistedState::default());

        let mut state = PersistedState::default();
        state.set(SELECTED_RECORD_KEY, "abc");
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap().selected_record(), Some("abc"));

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(store.load().unwrap(), PersistedState::default());
        let _ = std::fs::remove_dir_all(dir);
    }
}
