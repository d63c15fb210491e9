use crate::config::Config;
use crate::keymap::{self, Action};
use chrono::Utc;
use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use mpx_core::format::human_duration;
use mpx_core::keyboard;
use mpx_core::{
    FetchCompletion, FetchError, NavigationBridge, PollOutcome, SelectionReconciler, ServerEntry,
    SessionHistory, Snapshot, SnapshotPoller, SnapshotSource, Step,
};
use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct App {
    pub config: Config,
    pub poller: SnapshotPoller,
    pub selection: SelectionReconciler,
    pub nav: NavigationBridge<SessionHistory>,
    pub version: Option<String>,
    pub table_state: TableState,
    pub detail_scroll: u16,
    pub show_help: bool,
    pub status_note: Option<String>,
    list_area: Option<Rect>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        source: Arc<dyn SnapshotSource>,
        completions: mpsc::UnboundedSender<FetchCompletion>,
    ) -> Self {
        let poller = SnapshotPoller::new(source, completions, config.poller);
        let nav = NavigationBridge::new(SessionHistory::new(config.address.clone()));
        let mut selection = SelectionReconciler::new();
        nav.seed(&mut selection);

        Self {
            config,
            poller,
            selection,
            nav,
            version: None,
            table_state: TableState::default(),
            detail_scroll: 0,
            show_help: false,
            status_note: None,
            list_area: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.poller.snapshot()
    }

    /// The selected server as last reconciled against the published snapshot.
    pub fn selected(&self) -> Option<&ServerEntry> {
        self.selection.exposed()
    }

    pub fn is_online(&self) -> bool {
        self.poller.state().is_online()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.poller
            .state()
            .last_error
            .as_ref()
            .map(|err| err.message.as_str())
    }

    /// `"3s ago"` since the last successful refresh.
    pub fn since_update(&self) -> Option<String> {
        let at = self.poller.state().last_success_at?;
        let elapsed = (Utc::now() - at).to_std().unwrap_or_default();
        Some(format!("{} ago", human_duration(elapsed)))
    }

    pub fn apply_completion(&mut self, completion: FetchCompletion) {
        match self.poller.complete(completion) {
            PollOutcome::Updated(_) => {
                self.status_note = None;
                self.reconcile();
            }
            PollOutcome::Failed(kind) => {
                debug!("status_refresh_failed: kind={kind}");
            }
            PollOutcome::Discarded => {}
        }
    }

    pub fn apply_version(&mut self, result: Result<String, FetchError>) {
        match result {
            Ok(version) if !version.is_empty() => self.version = Some(version),
            Ok(_) => {}
            Err(err) => warn!("version_fetch_failed: {err}"),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let Some(action) = keymap::action_for(key) else {
            return;
        };
        match action {
            Action::Quit => self.should_quit = true,
            Action::Dismiss => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.select(None);
                }
            }
            Action::SelectFirst => {
                if self.selection.desired().is_none() {
                    let first = self
                        .snapshot()
                        .and_then(|snapshot| snapshot.servers.first())
                        .map(|entry| entry.tag.clone());
                    if let Some(tag) = first {
                        self.select(Some(&tag));
                    }
                }
            }
            Action::Move(step) => self.step(step),
            Action::Refresh => {
                self.poller.request_refresh();
            }
            Action::ToggleAutoRefresh => {
                let enabled = !self.poller.auto_refresh();
                self.poller.set_auto_refresh(enabled);
                if enabled {
                    self.poller.request_refresh();
                }
            }
            Action::Back => self.go_back(),
            Action::Forward => self.go_forward(),
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::ScrollDetail(delta) => self.scroll_detail(delta),
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(area) = self.list_area else {
                    return;
                };
                let Some(index) = self.row_from_coords(area, event.column, event.row) else {
                    return;
                };
                let tag = self
                    .snapshot()
                    .and_then(|snapshot| snapshot.servers.get(index))
                    .map(|entry| entry.tag.clone());
                if let Some(tag) = tag {
                    self.select(Some(&tag));
                }
            }
            MouseEventKind::ScrollUp => self.scroll_detail(-1),
            MouseEventKind::ScrollDown => self.scroll_detail(1),
            _ => {}
        }
    }

    /// Terminal focus drives visibility; regaining it refreshes right away.
    pub fn on_focus(&mut self, focused: bool) {
        self.poller.set_visible(focused);
        if focused {
            self.poller.tick();
        }
    }

    pub fn update_layout(&mut self, list_area: Rect) {
        self.list_area = Some(list_area);
    }

    pub fn select(&mut self, tag: Option<&str>) {
        self.nav.select(tag, &mut self.selection);
        self.reconcile();
    }

    fn step(&mut self, step: Step) {
        let Some(snapshot) = self.snapshot().cloned() else {
            return;
        };
        if keyboard::navigate(step, &snapshot, &mut self.selection, &mut self.nav) {
            self.reconcile();
        }
    }

    fn go_back(&mut self) {
        if let Some(state) = self.nav.history_mut().back() {
            self.apply_pop(state);
        }
    }

    fn go_forward(&mut self) {
        if let Some(state) = self.nav.history_mut().forward() {
            self.apply_pop(state);
        }
    }

    fn apply_pop(&mut self, state: url::Url) {
        let snapshot = self.snapshot().cloned();
        if let Some(kind) = self.nav.on_pop(&state, &mut self.selection, snapshot.as_deref()) {
            let tag = self.selection.desired().unwrap_or_default();
            self.status_note = Some(format!("{kind}: {tag} is not in the current status"));
        }
        self.reconcile();
    }

    /// Re-resolves the selection and keeps the table cursor on it.
    fn reconcile(&mut self) {
        let Some(snapshot) = self.snapshot().cloned() else {
            self.table_state.select(None);
            return;
        };
        if let Some(change) = self.selection.on_snapshot_changed(&snapshot) {
            if change.switched_server() {
                self.detail_scroll = 0;
            }
        }
        self.table_state.select(self.selection.position(&snapshot));
    }

    fn scroll_detail(&mut self, delta: i16) {
        if self.selected().is_none() {
            return;
        }
        self.detail_scroll = self.detail_scroll.saturating_add_signed(delta);
    }

    fn row_from_coords(&self, area: Rect, column: u16, row: u16) -> Option<usize> {
        if !contains(area, column, row) {
            return None;
        }

        let header_height = 2u16;
        if area.height <= header_height + 1 {
            return None;
        }

        let data_start = area.y.saturating_add(header_height);
        let data_end = area.y.saturating_add(area.height.saturating_sub(1));
        if row < data_start || row >= data_end {
            return None;
        }

        let row_index = (row - data_start) as usize;
        Some(self.table_state.offset() + row_index)
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}
