//! Application state management and input handling.

use crate::config::Keybindings;
use crate::controller::EpisodeListController;
use crate::types::Episode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;

use super::types::{Action, Focus};

/// Application state for the TUI.
pub struct App {
    /// Episode list state and the requests behind it
    pub controller: EpisodeListController,
    /// Current focus (filters or episodes)
    pub focus: Focus,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Cursor in the episode list
    pub episode_list_state: ListState,
    /// Cursor in the filter selector
    pub filter_list_state: ListState,
    /// Whether help modal is shown
    pub show_help: bool,
    /// Custom keybindings
    pub keybindings: Keybindings,
    /// Server shown in the header
    pub server_url: String,
    /// Local status line (export results, opener errors)
    pub status_message: Option<String>,
}

impl App {
    /// Create a new App around a controller.
    pub fn new(
        controller: EpisodeListController,
        keybindings: Keybindings,
        server_url: String,
    ) -> Self {
        let mut filter_list_state = ListState::default();
        filter_list_state.select(Some(controller.selected_filter_index()));

        Self {
            controller,
            focus: Focus::Episodes,
            should_quit: false,
            episode_list_state: ListState::default(),
            filter_list_state,
            show_help: false,
            keybindings,
            server_url,
            status_message: None,
        }
    }

    /// Keep cursors inside the current lists after the controller changed them.
    pub fn sync_selection(&mut self) {
        let len = self.controller.episodes().len();
        match self.episode_list_state.selected() {
            _ if len == 0 => self.episode_list_state.select(None),
            None => self.episode_list_state.select(Some(0)),
            Some(i) if i >= len => self.episode_list_state.select(Some(len - 1)),
            Some(_) => {}
        }

        let filters = self.controller.filter_options().len();
        match self.filter_list_state.selected() {
            Some(i) if i < filters => {}
            _ => self
                .filter_list_state
                .select(Some(self.controller.selected_filter_index())),
        }
    }

    /// Episode under the cursor.
    pub fn selected_episode(&self) -> Option<&Episode> {
        self.episode_list_state
            .selected()
            .and_then(|i| self.controller.episodes().get(i))
    }

    /// Set status message.
    pub fn set_status(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
    }

    /// Handle keyboard input and return an action.
    pub fn handle_input(&mut self, key: KeyEvent) -> Action {
        // Global quit with Ctrl+C
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Action::Quit;
        }

        if self.show_help {
            if key.code == KeyCode::Esc
                || self.keybindings.matches(&self.keybindings.help, &key)
                || self.keybindings.matches(&self.keybindings.quit, &key)
            {
                self.show_help = false;
            }
            return Action::None;
        }

        if self.keybindings.matches(&self.keybindings.help, &key) {
            self.show_help = true;
            return Action::None;
        }

        if key.code == KeyCode::Esc {
            self.controller.dismiss_notification();
            self.status_message = None;
            return Action::None;
        }

        if self.keybindings.matches(&self.keybindings.quit, &key) {
            self.should_quit = true;
            return Action::Quit;
        }

        if self
            .keybindings
            .matches(&self.keybindings.toggle_focus, &key)
        {
            self.focus = match self.focus {
                Focus::Filters => Focus::Episodes,
                Focus::Episodes => Focus::Filters,
            };
            return Action::None;
        }

        if self.keybindings.matches(&self.keybindings.refresh, &key) {
            return Action::Refresh;
        }
        if self.keybindings.matches(&self.keybindings.next_page, &key) {
            return Action::NextPage;
        }
        if self.keybindings.matches(&self.keybindings.previous_page, &key) {
            return Action::PreviousPage;
        }

        match self.focus {
            Focus::Filters => self.handle_filter_input(key),
            Focus::Episodes => self.handle_episode_input(key),
        }
    }

    fn handle_filter_input(&mut self, key: KeyEvent) -> Action {
        let len = self.controller.filter_options().len();

        if self.keybindings.matches(&self.keybindings.up, &key) {
            let i = self.filter_list_state.selected().unwrap_or(0);
            if i > 0 {
                self.filter_list_state.select(Some(i - 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.down, &key) {
            let i = self.filter_list_state.selected().unwrap_or(0);
            if i < len.saturating_sub(1) {
                self.filter_list_state.select(Some(i + 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.select, &key) {
            let Some(option) = self
                .filter_list_state
                .selected()
                .and_then(|i| self.controller.filter_options().get(i))
            else {
                return Action::None;
            };
            let value = option.value.clone();
            self.focus = Focus::Episodes;
            self.episode_list_state.select(Some(0));
            Action::SelectFilter(value)
        } else {
            Action::None
        }
    }

    fn handle_episode_input(&mut self, key: KeyEvent) -> Action {
        let len = self.controller.episodes().len();

        if self.keybindings.matches(&self.keybindings.up, &key) {
            let i = self.episode_list_state.selected().unwrap_or(0);
            if i > 0 {
                self.episode_list_state.select(Some(i - 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.down, &key) {
            let i = self.episode_list_state.selected().unwrap_or(0);
            if i < len.saturating_sub(1) {
                self.episode_list_state.select(Some(i + 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.export, &key) {
            Action::Export
        } else if self.keybindings.matches(&self.keybindings.select, &key) {
            self.selected_episode()
                .map(|e| Action::ShowDetails(e.id.clone()))
                .unwrap_or(Action::None)
        } else if self.keybindings.matches(&self.keybindings.mark_listened, &key) {
            self.selected_episode()
                .map(|e| Action::MarkListened(e.id.clone()))
                .unwrap_or(Action::None)
        } else if self.keybindings.matches(&self.keybindings.open, &key) {
            self.selected_episode()
                .map(|e| Action::OpenLink(e.listen_link().url))
                .unwrap_or(Action::None)
        } else {
            Action::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EpisodeService;
    use crate::controller::Outcome;
    use crate::error::{AppError, Result};
    use crate::types::{Id, ListQuery, ListResult, Podcast, RefreshResponse};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    struct OfflineService;

    #[async_trait]
    impl EpisodeService for OfflineService {
        async fn fetch_podcasts(&self) -> Result<Vec<Podcast>> {
            Err(AppError::Network("offline".to_string()))
        }
        async fn fetch_episodes(&self, _query: &ListQuery) -> Result<ListResult> {
            Err(AppError::Network("offline".to_string()))
        }
        async fn fetch_episode(&self, _id: &Id) -> Result<Episode> {
            Err(AppError::Network("offline".to_string()))
        }
        async fn mark_listened(&self, _id: &Id) -> Result<()> {
            Err(AppError::Network("offline".to_string()))
        }
        async fn refresh_podcasts(&self) -> Result<RefreshResponse> {
            Err(AppError::Network("offline".to_string()))
        }
    }

    fn episode(id: i64, spotify: Option<&str>) -> Episode {
        Episode {
            id: Id::Number(id),
            title: format!("Episode {}", id),
            description: None,
            pub_date: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
            duration: None,
            episode_url: format!("https://example.com/{}.mp3", id),
            spotify_url: spotify.map(str::to_string),
            podcast_id: None,
            podcast: None,
            listened: false,
        }
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn app_with_page() -> App {
        let controller = EpisodeListController::new(Arc::new(OfflineService));
        let mut app = App::new(controller, Keybindings::default(), "http://x".to_string());
        let request = app.controller.request_episodes(1);
        let crate::controller::Request::Episodes { token, .. } = request else {
            panic!("expected list request");
        };
        app.controller.apply(Outcome::Podcasts(Ok(vec![
            Podcast::new(Id::Number(1), "Alpha"),
            Podcast::new(Id::Number(2), "Beta"),
        ])));
        app.controller.apply(Outcome::Episodes {
            token,
            result: Ok(ListResult {
                episodes: vec![episode(1, None), episode(2, Some("https://open.spotify.com/e/2"))],
                page: 1,
                total_pages: 2,
                total: 22,
                page_size: Some(20),
            }),
        });
        app.sync_selection();
        app
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app_with_page();
        assert_eq!(app.handle_input(key('q')), Action::Quit);
        assert!(app.should_quit);

        let mut app = app_with_page();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_input(ctrl_c), Action::Quit);
    }

    #[test]
    fn test_episode_navigation_and_actions() {
        let mut app = app_with_page();
        assert_eq!(app.episode_list_state.selected(), Some(0));
        assert_eq!(
            app.handle_input(key('m')),
            Action::MarkListened(Id::Number(1))
        );

        app.handle_input(key('j'));
        app.handle_input(key('j'));
        assert_eq!(app.episode_list_state.selected(), Some(1));
        assert_eq!(
            app.handle_input(key('o')),
            Action::OpenLink("https://open.spotify.com/e/2".to_string())
        );
        assert_eq!(
            app.handle_input(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Action::ShowDetails(Id::Number(2))
        );
    }

    #[test]
    fn test_paging_and_refresh_keys() {
        let mut app = app_with_page();
        assert_eq!(app.handle_input(key('n')), Action::NextPage);
        assert_eq!(app.handle_input(key('p')), Action::PreviousPage);
        assert_eq!(app.handle_input(key('r')), Action::Refresh);
        assert_eq!(app.handle_input(key('e')), Action::Export);
    }

    #[test]
    fn test_filter_selection() {
        let mut app = app_with_page();
        app.handle_input(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(app.focus, Focus::Filters);

        app.handle_input(key('j'));
        app.handle_input(key('j'));
        let action = app.handle_input(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(action, Action::SelectFilter(Some(Id::Number(2))));
        assert_eq!(app.focus, Focus::Episodes);
    }

    #[test]
    fn test_sentinel_clears_filter() {
        let mut app = app_with_page();
        app.focus = Focus::Filters;
        app.filter_list_state.select(Some(0));
        let action = app.handle_input(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(action, Action::SelectFilter(None));
    }

    #[test]
    fn test_help_modal_swallows_keys() {
        let mut app = app_with_page();
        app.handle_input(key('?'));
        assert!(app.show_help);
        assert_eq!(app.handle_input(key('m')), Action::None);
        app.handle_input(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.show_help);
    }

    #[test]
    fn test_sync_selection_clamps() {
        let mut app = app_with_page();
        app.episode_list_state.select(Some(5));
        app.sync_selection();
        assert_eq!(app.episode_list_state.selected(), Some(1));
    }

    #[test]
    fn test_empty_list_has_no_actions() {
        let controller = EpisodeListController::new(Arc::new(OfflineService));
        let mut app = App::new(controller, Keybindings::default(), "http://x".to_string());
        app.sync_selection();
        assert_eq!(app.handle_input(key('m')), Action::None);
        assert_eq!(app.handle_input(key('o')), Action::None);
    }
}
