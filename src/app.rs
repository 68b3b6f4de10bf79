use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use url::Url;

use crate::config::{AppConfig, NOTICE_SECS};
use crate::data::feed::{self, FeedKind};
use crate::data::formatter::{Formatter, RenderResult};
use crate::data::handlers::{CommandStarter, HandlerRegistry};
use crate::data::launcher::{LaunchOutcome, Launcher};
use crate::event::AppEvent;
use crate::model::feed::FeedEvent;
use crate::model::intent::ChooserCandidate;
use crate::strings::{StringKey, Templates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveTab {
    /// Events read from a JSON file.
    File,
    Received,
    Performed,
    Public,
}

impl ActiveTab {
    pub fn feed_kind(self) -> Option<FeedKind> {
        match self {
            ActiveTab::File => None,
            ActiveTab::Received => Some(FeedKind::Received),
            ActiveTab::Performed => Some(FeedKind::Performed),
            ActiveTab::Public => Some(FeedKind::Public),
        }
    }

    pub fn from_kind(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Received => ActiveTab::Received,
            FeedKind::Performed => ActiveTab::Performed,
            FeedKind::Public => ActiveTab::Public,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActiveTab::File => "File",
            ActiveTab::Received => FeedKind::Received.label(),
            ActiveTab::Performed => FeedKind::Performed.label(),
            ActiveTab::Public => FeedKind::Public.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedPane {
    List,
    Detail,
}

/// Events of one tab and their rendered rows, index-aligned.
#[derive(Debug, Default)]
pub struct FeedState {
    pub events: Vec<FeedEvent>,
    pub rows: Vec<RenderResult>,
    pub index: usize,
    pub detail_scroll: usize,
    pub loading: bool,
    pub loaded: bool,
    pub new_activity: bool,
    pub last_poll: Option<Instant>,
}

/// Handler selection dialog shown when a link has several handlers.
#[derive(Debug)]
pub struct ChooserState {
    pub candidates: Vec<ChooserCandidate>,
    pub index: usize,
}

/// Startup inputs resolved by `main` (CLI flags, gh detection).
pub struct AppOptions {
    pub config: AppConfig,
    pub feed_file: Option<PathBuf>,
    pub user: Option<String>,
    pub has_gh: bool,
}

pub struct App {
    pub should_quit: bool,
    pub active_tab: ActiveTab,
    pub show_help: bool,
    pub dirty: bool,

    // Config
    pub config: AppConfig,
    pub templates: Templates,
    pub teaser_len: usize,

    // Sources
    pub has_gh: bool,
    pub gh_user: Option<String>,
    pub feed_file: Option<PathBuf>,

    // Feeds
    pub feeds: HashMap<ActiveTab, FeedState>,
    pub pane: FeedPane,

    // Links
    pub launcher: Launcher<HandlerRegistry, CommandStarter>,
    pub chooser: Option<ChooserState>,

    // Status
    pub notice: Option<(String, Instant)>,
    pub last_error: Option<String>,
    pub event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl App {
    pub fn new(options: AppOptions) -> Self {
        let AppOptions {
            config,
            feed_file,
            user,
            has_gh,
        } = options;
        let templates = Templates::with_overrides(&config.string_overrides());
        let teaser_len = config.teaser_length();
        let registry = HandlerRegistry::from_config(&config);
        let starter = registry.starter();

        let mut app = App {
            should_quit: false,
            active_tab: ActiveTab::Public,
            show_help: false,
            dirty: true,

            config,
            templates,
            teaser_len,

            has_gh,
            gh_user: user,
            feed_file,

            feeds: HashMap::new(),
            pane: FeedPane::List,

            launcher: Launcher::new(registry, starter),
            chooser: None,

            notice: None,
            last_error: None,
            event_tx: None,
        };
        if let Some(first) = app.visible_tabs().first() {
            app.active_tab = *first;
        }
        app
    }

    /// Return the tabs that can show something with the current sources.
    pub fn visible_tabs(&self) -> Vec<ActiveTab> {
        if self.feed_file.is_some() {
            return vec![ActiveTab::File];
        }
        if !self.has_gh {
            return Vec::new();
        }
        let tabs_config = self.config.tabs_config();
        [
            (ActiveTab::Received, tabs_config.received()),
            (ActiveTab::Performed, tabs_config.performed()),
            (ActiveTab::Public, tabs_config.public()),
        ]
        .into_iter()
        .filter(|(tab, enabled)| {
            *enabled
                && tab
                    .feed_kind()
                    .is_some_and(|kind| !kind.needs_user() || self.gh_user.is_some())
        })
        .map(|(tab, _)| tab)
        .collect()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn feed(&self) -> Option<&FeedState> {
        self.feeds.get(&self.active_tab)
    }

    fn feed_mut(&mut self) -> &mut FeedState {
        self.feeds.entry(self.active_tab).or_default()
    }

    pub fn formatter(&self) -> Formatter<'_> {
        Formatter::new(&self.templates).with_teaser_len(self.teaser_len)
    }

    // --- Loading ---

    /// Load every visible tab.
    pub fn load_all(&mut self) {
        for tab in self.visible_tabs() {
            self.load_feed(tab);
        }
    }

    pub fn load_feed(&mut self, tab: ActiveTab) {
        match tab.feed_kind() {
            None => {
                let Some(path) = self.feed_file.clone() else {
                    return;
                };
                let result = feed::load_feed_file(&path).map_err(|e| format!("{:#}", e));
                self.handle_feed_loaded(tab, result);
            }
            Some(kind) => {
                if !self.has_gh {
                    return;
                }
                let user = self.gh_user.clone();
                let per_page = self.config.per_page();
                let state = self.feeds.entry(tab).or_default();
                if state.loading {
                    return;
                }
                state.loading = true;
                state.last_poll = Some(Instant::now());

                match self.event_tx.clone() {
                    Some(tx) => {
                        std::thread::spawn(move || {
                            let result = feed::fetch_feed(kind, user.as_deref(), per_page)
                                .map_err(|e| format!("{:#}", e));
                            let _ = tx.send(AppEvent::FeedLoaded(kind, result));
                        });
                    }
                    None => {
                        let result = feed::fetch_feed(kind, user.as_deref(), per_page)
                            .map_err(|e| format!("{:#}", e));
                        self.handle_feed_loaded(tab, result);
                    }
                }
            }
        }
    }

    pub fn handle_feed_loaded(&mut self, tab: ActiveTab, result: Result<Vec<FeedEvent>, String>) {
        match result {
            Ok(events) => {
                let rows: Vec<RenderResult> = {
                    let formatter = self.formatter();
                    events.iter().map(|e| formatter.render(e)).collect()
                };
                let is_active = tab == self.active_tab;
                let state = self.feeds.entry(tab).or_default();
                let had_events = state.loaded;
                let newest_changed = state.events.first() != events.first();

                state.events = events;
                state.rows = rows;
                state.loading = false;
                state.loaded = true;
                if state.index >= state.rows.len() {
                    state.index = 0;
                    state.detail_scroll = 0;
                }
                if had_events && newest_changed && !is_active {
                    state.new_activity = true;
                }
                tracing::debug!(tab = ?tab, count = state.rows.len(), "feed updated");
                self.last_error = None;
            }
            Err(e) => {
                if let Some(state) = self.feeds.get_mut(&tab) {
                    state.loading = false;
                }
                tracing::warn!(tab = ?tab, error = %e, "feed load failed");
                self.last_error = Some(format!("{}: {}", tab.label(), e));
            }
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::FeedFileChanged => self.load_feed(ActiveTab::File),
            AppEvent::FeedLoaded(kind, result) => {
                self.handle_feed_loaded(ActiveTab::from_kind(kind), result)
            }
        }
    }

    /// Re-fetch `gh` feeds whose poll interval has elapsed.
    pub fn poll_feeds(&mut self) {
        let interval = Duration::from_secs(self.config.poll_interval());
        for tab in self.visible_tabs() {
            if tab.feed_kind().is_none() {
                continue;
            }
            let due = self
                .feeds
                .get(&tab)
                .and_then(|s| s.last_poll)
                .map(|t| t.elapsed() >= interval)
                .unwrap_or(true);
            if due {
                self.load_feed(tab);
            }
        }
    }

    pub fn refresh_current(&mut self) {
        self.load_feed(self.active_tab);
    }

    // --- Navigation ---

    pub fn next_tab(&mut self) {
        let tabs = self.visible_tabs();
        if let Some(idx) = tabs.iter().position(|t| *t == self.active_tab) {
            let next = (idx + 1) % tabs.len();
            self.switch_to_tab(tabs[next]);
        }
    }

    pub fn prev_tab(&mut self) {
        let tabs = self.visible_tabs();
        if let Some(idx) = tabs.iter().position(|t| *t == self.active_tab) {
            let prev = if idx == 0 { tabs.len() - 1 } else { idx - 1 };
            self.switch_to_tab(tabs[prev]);
        }
    }

    pub fn switch_to_tab(&mut self, tab: ActiveTab) {
        // Clear new-activity badge when switching to that tab
        if let Some(state) = self.feeds.get_mut(&tab) {
            state.new_activity = false;
        }
        self.active_tab = tab;
        self.pane = FeedPane::List;
    }

    pub fn navigate_down(&mut self) {
        let pane = self.pane.clone();
        let state = self.feed_mut();
        match pane {
            FeedPane::List => {
                if !state.rows.is_empty() {
                    state.index = (state.index + 1).min(state.rows.len() - 1);
                    state.detail_scroll = 0;
                }
            }
            FeedPane::Detail => {
                state.detail_scroll = state.detail_scroll.saturating_add(1);
            }
        }
    }

    pub fn navigate_up(&mut self) {
        let pane = self.pane.clone();
        let state = self.feed_mut();
        match pane {
            FeedPane::List => {
                if state.index > 0 {
                    state.index -= 1;
                    state.detail_scroll = 0;
                }
            }
            FeedPane::Detail => {
                state.detail_scroll = state.detail_scroll.saturating_sub(1);
            }
        }
    }

    pub fn navigate_left(&mut self) {
        self.pane = FeedPane::List;
    }

    pub fn navigate_right(&mut self) {
        self.pane = FeedPane::Detail;
    }

    pub fn jump_top(&mut self) {
        let pane = self.pane.clone();
        let state = self.feed_mut();
        match pane {
            FeedPane::List => {
                state.index = 0;
                state.detail_scroll = 0;
            }
            FeedPane::Detail => state.detail_scroll = 0,
        }
    }

    pub fn jump_bottom(&mut self) {
        let pane = self.pane.clone();
        let state = self.feed_mut();
        match pane {
            FeedPane::List => {
                state.index = state.rows.len().saturating_sub(1);
                state.detail_scroll = 0;
            }
            FeedPane::Detail => state.detail_scroll = usize::MAX / 2,
        }
    }

    /// Enter: focus the detail pane, or open the event link from there.
    pub fn select_item(&mut self) {
        match self.pane {
            FeedPane::List => self.pane = FeedPane::Detail,
            FeedPane::Detail => self.open_selected_link(),
        }
    }

    pub fn selected_event(&self) -> Option<&FeedEvent> {
        let state = self.feed()?;
        if state.events.is_empty() {
            return None;
        }
        state.events.get(state.index.min(state.events.len() - 1))
    }

    pub fn selected_row(&self) -> Option<&RenderResult> {
        let state = self.feed()?;
        if state.rows.is_empty() {
            return None;
        }
        state.rows.get(state.index.min(state.rows.len() - 1))
    }

    // --- Links ---

    pub fn open_selected_link(&mut self) {
        match self.selected_event().and_then(FeedEvent::link_url) {
            Some(url) => self.open_url(&url),
            None => self.set_notice("Nothing to open for this event"),
        }
    }

    pub fn open_selected_actor(&mut self) {
        if let Some(url) = self.selected_event().and_then(FeedEvent::actor_url) {
            self.open_url(&url);
        }
    }

    pub fn open_url(&mut self, url: &str) {
        let uri = match Url::parse(url) {
            Ok(uri) => uri,
            Err(e) => {
                self.last_error = Some(format!("Bad link {}: {}", url, e));
                return;
            }
        };
        match self.launcher.launch_or_choose(&uri) {
            Ok(outcome) => self.handle_launch_outcome(outcome),
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "launch failed");
                self.last_error = Some(format!("{:#}", e));
            }
        }
    }

    pub fn handle_launch_outcome(&mut self, outcome: LaunchOutcome) {
        match outcome {
            LaunchOutcome::Launched(candidate) => {
                let msg = self.templates.format(StringKey::OpenedIn, &[&candidate.label]);
                self.set_notice(msg);
            }
            LaunchOutcome::Choose(candidates) => {
                self.chooser = Some(ChooserState {
                    candidates,
                    index: 0,
                });
            }
            LaunchOutcome::NoHandler => {
                let msg = self.templates.get(StringKey::NoBrowserFound).to_string();
                self.set_notice(msg);
            }
        }
    }

    pub fn chooser_down(&mut self) {
        if let Some(chooser) = self.chooser.as_mut() {
            if chooser.index + 1 < chooser.candidates.len() {
                chooser.index += 1;
            }
        }
    }

    pub fn chooser_up(&mut self) {
        if let Some(chooser) = self.chooser.as_mut() {
            chooser.index = chooser.index.saturating_sub(1);
        }
    }

    pub fn chooser_select(&mut self, idx: usize) {
        if let Some(chooser) = self.chooser.as_mut() {
            if idx < chooser.candidates.len() {
                chooser.index = idx;
                self.confirm_chooser();
            }
        }
    }

    pub fn confirm_chooser(&mut self) {
        let Some(chooser) = self.chooser.take() else {
            return;
        };
        let Some(candidate) = chooser.candidates.get(chooser.index) else {
            return;
        };
        match self.launcher.start(candidate) {
            Ok(()) => {
                let msg = self.templates.format(StringKey::OpenedIn, &[&candidate.label]);
                self.set_notice(msg);
            }
            Err(e) => {
                tracing::warn!(package = %candidate.package, error = %e, "launch failed");
                self.last_error = Some(format!("{:#}", e));
            }
        }
    }

    pub fn cancel_chooser(&mut self) {
        self.chooser = None;
    }

    // --- Status ---

    pub fn set_notice(&mut self, msg: impl Into<String>) {
        self.notice = Some((msg.into(), Instant::now()));
    }

    pub fn clear_stale_notice(&mut self) {
        if let Some((_, at)) = &self.notice {
            if at.elapsed() >= Duration::from_secs(NOTICE_SECS) {
                self.notice = None;
                self.dirty = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feed::parse_events;

    fn file_app(config: &str) -> App {
        App::new(AppOptions {
            config: toml::from_str(config).unwrap(),
            feed_file: Some(PathBuf::from("feed.json")),
            user: None,
            has_gh: false,
        })
    }

    fn sample_events() -> Vec<FeedEvent> {
        parse_events(
            br#"[
                {"type": "ForkEvent", "actor": "octocat",
                 "repository": {"owner": "octo", "name": "hello"}, "payload": {}},
                {"type": "WatchEvent", "actor": "hubot",
                 "payload": {"action": "started", "repo": "octo/world"}},
                {"type": "TeamAddEvent", "actor": "x"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn tabs_follow_sources() {
        let app = file_app("");
        assert_eq!(app.visible_tabs(), vec![ActiveTab::File]);
        assert_eq!(app.active_tab, ActiveTab::File);

        let app = App::new(AppOptions {
            config: toml::from_str("[tabs]\nperformed = false\n").unwrap(),
            feed_file: None,
            user: Some("octocat".into()),
            has_gh: true,
        });
        assert_eq!(
            app.visible_tabs(),
            vec![ActiveTab::Received, ActiveTab::Public]
        );

        let app = App::new(AppOptions {
            config: AppConfig::default(),
            feed_file: None,
            user: None,
            has_gh: true,
        });
        assert_eq!(app.visible_tabs(), vec![ActiveTab::Public]);
    }

    #[test]
    fn loaded_events_are_rendered_and_navigable() {
        let mut app = file_app("");
        app.handle_feed_loaded(ActiveTab::File, Ok(sample_events()));
        let state = app.feed().unwrap();
        assert_eq!(state.rows.len(), 3);
        assert_eq!(state.rows[0].title, "octocat forked octo/hello");
        assert_eq!(state.rows[2].title, "");

        app.navigate_down();
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.feed().unwrap().index, 2);
        app.navigate_up();
        assert_eq!(app.selected_event().unwrap().actor, "hubot");
        app.jump_top();
        assert_eq!(app.feed().unwrap().index, 0);
    }

    #[test]
    fn load_error_is_reported() {
        let mut app = file_app("");
        app.handle_feed_loaded(ActiveTab::File, Err("boom".into()));
        assert_eq!(app.last_error.as_deref(), Some("File: boom"));
    }

    #[test]
    fn template_overrides_reach_rows() {
        let mut app = file_app("[strings]\nevent_fork_title = \"{0} -> {1}/{2}\"\n");
        app.handle_feed_loaded(ActiveTab::File, Ok(sample_events()));
        assert_eq!(app.feed().unwrap().rows[0].title, "octocat -> octo/hello");
    }

    #[test]
    fn no_handler_shows_notice() {
        let mut app = file_app("[launcher]\nsystem = false\n");
        app.open_url("https://github.com/octo/hello");
        assert!(app.chooser.is_none());
        assert_eq!(
            app.notice.as_ref().map(|(m, _)| m.as_str()),
            Some("No application found to open this link")
        );
    }

    #[test]
    fn several_handlers_open_chooser() {
        let mut app = file_app(
            r#"
            [[launcher.handlers]]
            id = "firefox"
            name = "Firefox"
            command = ["true"]
            "#,
        );
        app.open_url("https://github.com/octo/hello");
        let chooser = app.chooser.as_ref().unwrap();
        assert_eq!(chooser.candidates.len(), 2);
        app.chooser_down();
        app.chooser_down();
        assert_eq!(app.chooser.as_ref().unwrap().index, 1);
        app.cancel_chooser();
        assert!(app.chooser.is_none());
    }

    #[test]
    fn bad_link_is_an_error() {
        let mut app = file_app("");
        app.open_url("not a url");
        assert!(app.last_error.is_some());
    }
}
