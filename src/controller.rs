//! Paginated, filtered episode list synchronized with the remote service.
//!
//! The controller is a small state machine. User intents (`request_*`)
//! update local state and return the [`Request`] to run; finished requests
//! come back as an [`Outcome`] passed to [`EpisodeListController::apply`],
//! which may ask for a follow-up request. The terminal loop runs requests in
//! background tasks via [`EpisodeListController::spawn`]; the `async`
//! operations (`load_episodes`, `mark_listened`, ...) run the same cycle
//! inline.
//!
//! List requests carry a monotonically increasing token and only the
//! outcome of the latest one is applied, so a slow response can never
//! overwrite newer content.

use crate::api::EpisodeService;
use crate::card::EpisodeCard;
use crate::error::Result;
use crate::types::{Episode, Id, ListQuery, ListResult, Podcast, RefreshResponse};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Label of the filter sentinel that clears the podcast filter.
pub const ALL_PODCASTS: &str = "All podcasts";

/// Notification shown when the refresh request itself fails.
pub const REFRESH_FAILED: &str = "Failed to refresh podcasts";

/// A request the controller wants run against the service.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Podcasts,
    Episodes { token: u64, query: ListQuery },
    Episode(Id),
    MarkListened(Id),
    Refresh,
}

/// The result of running a [`Request`].
#[derive(Debug)]
pub enum Outcome {
    Podcasts(Result<Vec<Podcast>>),
    Episodes { token: u64, result: Result<ListResult> },
    Episode(Result<Episode>),
    Listened { episode_id: Id, result: Result<()> },
    Refreshed(Result<RefreshResponse>),
}

/// Run a single request against the service.
pub async fn execute(service: &dyn EpisodeService, request: Request) -> Outcome {
    match request {
        Request::Podcasts => Outcome::Podcasts(service.fetch_podcasts().await),
        Request::Episodes { token, query } => Outcome::Episodes {
            token,
            result: service.fetch_episodes(&query).await,
        },
        Request::Episode(id) => Outcome::Episode(service.fetch_episode(&id).await),
        Request::MarkListened(id) => {
            let result = service.mark_listened(&id).await;
            Outcome::Listened {
                episode_id: id,
                result,
            }
        }
        Request::Refresh => Outcome::Refreshed(service.refresh_podcasts().await),
    }
}

/// One entry of the podcast filter selector. `value: None` is the sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOption {
    pub value: Option<Id>,
    pub label: String,
}

impl FilterOption {
    fn all() -> Self {
        Self {
            value: None,
            label: ALL_PODCASTS.to_string(),
        }
    }
}

/// Pagination controls derived from the last successful list result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

impl Pagination {
    pub fn from_result(result: &ListResult) -> Self {
        Self {
            page: result.page,
            total_pages: result.total_pages,
            previous_enabled: result.page != 1,
            next_enabled: result.page != result.total_pages,
        }
    }

    pub fn label(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages)
    }
}

/// What the list area currently shows.
#[derive(Clone, Debug, PartialEq)]
pub enum ListView {
    /// Nothing fetched yet
    Idle,
    /// Episodes of the acknowledged page
    Episodes(Vec<Episode>),
    /// The last query matched nothing
    Empty,
}

/// State of the refresh button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshControl {
    pub enabled: bool,
}

impl RefreshControl {
    pub fn label(&self) -> &'static str {
        if self.enabled {
            "Refresh"
        } else {
            "Refreshing..."
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

/// A non-blocking message for the user.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    shown_at: Option<Instant>,
}

/// Owner of the page, filter and everything rendered from them.
pub struct EpisodeListController {
    service: Arc<dyn EpisodeService>,
    current_page: u32,
    podcast_filter: Option<Id>,
    podcasts: Vec<Podcast>,
    filter_options: Vec<FilterOption>,
    view: ListView,
    pagination: Option<Pagination>,
    loading: bool,
    total_podcasts: Option<usize>,
    total_episodes: Option<u64>,
    refresh: RefreshControl,
    refresh_reload_token: Option<u64>,
    notifications: VecDeque<Notification>,
    latest_token: u64,
}

impl EpisodeListController {
    pub fn new(service: Arc<dyn EpisodeService>) -> Self {
        Self {
            service,
            current_page: 1,
            podcast_filter: None,
            podcasts: Vec::new(),
            filter_options: vec![FilterOption::all()],
            view: ListView::Idle,
            pagination: None,
            loading: false,
            total_podcasts: None,
            total_episodes: None,
            refresh: RefreshControl { enabled: true },
            refresh_reload_token: None,
            notifications: VecDeque::new(),
            latest_token: 0,
        }
    }

    /// Start with a podcast filter already selected.
    pub fn with_filter(mut self, podcast_filter: Option<Id>) -> Self {
        self.podcast_filter = podcast_filter;
        self
    }

    /// Page of the last successful list response, or the page a filter
    /// change reset to.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn podcast_filter(&self) -> Option<&Id> {
        self.podcast_filter.as_ref()
    }

    pub fn podcasts(&self) -> &[Podcast] {
        &self.podcasts
    }

    pub fn filter_options(&self) -> &[FilterOption] {
        &self.filter_options
    }

    /// Index of the active filter in [`Self::filter_options`].
    pub fn selected_filter_index(&self) -> usize {
        self.filter_options
            .iter()
            .position(|option| option.value == self.podcast_filter)
            .unwrap_or(0)
    }

    /// Label of the active filter option.
    pub fn filter_label(&self) -> &str {
        self.filter_options
            .get(self.selected_filter_index())
            .map(|option| option.label.as_str())
            .unwrap_or(ALL_PODCASTS)
    }

    pub fn view(&self) -> &ListView {
        &self.view
    }

    pub fn episodes(&self) -> &[Episode] {
        match &self.view {
            ListView::Episodes(episodes) => episodes,
            _ => &[],
        }
    }

    /// Pagination controls, absent until a non-empty page was loaded.
    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn total_podcasts(&self) -> Option<usize> {
        self.total_podcasts
    }

    pub fn total_episodes(&self) -> Option<u64> {
        self.total_episodes
    }

    pub fn refresh_control(&self) -> RefreshControl {
        self.refresh
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    /// The notification currently on screen.
    pub fn active_notification(&self) -> Option<&Notification> {
        self.notifications.front()
    }

    /// Start the display clock of the front notification and drop it once
    /// it has been visible for `ttl`.
    pub fn tick_notifications(&mut self, now: Instant, ttl: Duration) {
        if let Some(front) = self.notifications.front_mut() {
            match front.shown_at {
                None => front.shown_at = Some(now),
                Some(shown) if now.duration_since(shown) >= ttl => {
                    self.notifications.pop_front();
                    if let Some(next) = self.notifications.front_mut() {
                        next.shown_at = Some(now);
                    }
                }
                Some(_) => {}
            }
        }
    }

    pub fn dismiss_notification(&mut self) {
        self.notifications.pop_front();
    }

    /// Cards for the current page, dated relative to `now`.
    pub fn cards<Tz>(&self, now: &DateTime<Utc>, tz: &Tz) -> Vec<EpisodeCard>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.episodes()
            .iter()
            .map(|episode| EpisodeCard::from_episode(episode, now, tz))
            .collect()
    }

    // Intents

    pub fn request_podcasts(&self) -> Request {
        Request::Podcasts
    }

    /// Issue a list request for `page` with the current filter.
    pub fn request_episodes(&mut self, page: u32) -> Request {
        self.latest_token += 1;
        self.loading = true;
        let query = ListQuery::new(page, self.podcast_filter.clone());
        Request::Episodes {
            token: self.latest_token,
            query,
        }
    }

    pub fn request_reload(&mut self) -> Request {
        self.request_episodes(self.current_page)
    }

    /// Switch filter and go back to the first page.
    pub fn request_filter_change(&mut self, podcast_filter: Option<Id>) -> Request {
        info!(
            "Filter changed to {}",
            podcast_filter
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| ALL_PODCASTS.to_string())
        );
        self.podcast_filter = podcast_filter;
        self.current_page = 1;
        self.request_episodes(1)
    }

    pub fn request_next_page(&mut self) -> Option<Request> {
        let pagination = self.pagination.filter(|p| p.next_enabled)?;
        Some(self.request_episodes(pagination.page + 1))
    }

    pub fn request_previous_page(&mut self) -> Option<Request> {
        let pagination = self.pagination.filter(|p| p.previous_enabled)?;
        Some(self.request_episodes(pagination.page.saturating_sub(1).max(1)))
    }

    pub fn request_mark_listened(&self, episode_id: Id) -> Request {
        Request::MarkListened(episode_id)
    }

    pub fn request_details(&self, episode_id: Id) -> Request {
        Request::Episode(episode_id)
    }

    /// Disable the refresh control and ask for a backend refresh. Ignored
    /// while a refresh is already running.
    pub fn request_refresh(&mut self) -> Option<Request> {
        if !self.refresh.enabled {
            debug!("Refresh already running, ignoring");
            return None;
        }
        self.refresh.enabled = false;
        Some(Request::Refresh)
    }

    // Outcomes

    /// Fold a finished request into the state. Returns a follow-up request
    /// when the outcome calls for one.
    pub fn apply(&mut self, outcome: Outcome) -> Option<Request> {
        match outcome {
            Outcome::Podcasts(result) => {
                self.apply_podcasts(result);
                None
            }
            Outcome::Episodes { token, result } => {
                self.apply_episodes(token, result);
                None
            }
            Outcome::Episode(result) => {
                self.apply_details(result);
                None
            }
            Outcome::Listened { episode_id, result } => match result {
                Ok(()) => {
                    debug!("Reloading page {} after marking {}", self.current_page, episode_id);
                    Some(self.request_reload())
                }
                Err(e) => {
                    error!("Error marking episode {} as listened: {}", episode_id, e);
                    None
                }
            },
            Outcome::Refreshed(result) => self.apply_refresh(result),
        }
    }

    fn apply_podcasts(&mut self, result: Result<Vec<Podcast>>) {
        match result {
            Ok(podcasts) => {
                self.total_podcasts = Some(podcasts.len());
                self.filter_options = std::iter::once(FilterOption::all())
                    .chain(podcasts.iter().map(|p| FilterOption {
                        value: Some(p.id.clone()),
                        label: p.name.clone(),
                    }))
                    .collect();
                self.podcasts = podcasts;
            }
            Err(e) => error!("Error loading podcasts: {}", e),
        }
    }

    fn apply_episodes(&mut self, token: u64, result: Result<ListResult>) {
        if token != self.latest_token {
            debug!(
                "Discarding stale episode response (token {}, latest {})",
                token, self.latest_token
            );
            return;
        }

        self.loading = false;
        match result {
            Ok(result) => {
                self.total_episodes = Some(result.total);
                self.current_page = result.page.max(1);
                if result.episodes.is_empty() {
                    self.view = ListView::Empty;
                    self.pagination = None;
                } else {
                    self.pagination = Some(Pagination::from_result(&result));
                    self.view = ListView::Episodes(result.episodes);
                }
            }
            Err(e) => error!("Error loading episodes: {}", e),
        }

        if self.refresh_reload_token.is_some_and(|t| token >= t) {
            self.finish_refresh();
        }
    }

    fn apply_details(&mut self, result: Result<Episode>) {
        match result {
            Ok(episode) => {
                if let ListView::Episodes(episodes) = &mut self.view {
                    if let Some(slot) = episodes.iter_mut().find(|e| e.id == episode.id) {
                        *slot = episode;
                    }
                }
            }
            Err(e) => warn!("Error loading episode details: {}", e),
        }
    }

    fn apply_refresh(&mut self, result: Result<RefreshResponse>) -> Option<Request> {
        match result {
            Ok(response) => {
                self.notify(response.message, NotificationKind::Info);
                let reload = self.request_reload();
                if let Request::Episodes { token, .. } = &reload {
                    self.refresh_reload_token = Some(*token);
                }
                Some(reload)
            }
            Err(e) => {
                error!("Error refreshing podcasts: {}", e);
                self.notify(REFRESH_FAILED.to_string(), NotificationKind::Error);
                self.finish_refresh();
                None
            }
        }
    }

    fn finish_refresh(&mut self) {
        self.refresh.enabled = true;
        self.refresh_reload_token = None;
    }

    fn notify(&mut self, message: String, kind: NotificationKind) {
        self.notifications.push_back(Notification {
            message,
            kind,
            shown_at: None,
        });
    }

    // Drivers

    /// Run `request` in a background task and send its outcome to `tx`.
    pub fn spawn(&self, request: Request, tx: UnboundedSender<Outcome>) {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            let outcome = execute(service.as_ref(), request).await;
            if tx.send(outcome).is_err() {
                debug!("Outcome receiver dropped");
            }
        });
    }

    /// Run `request` and every follow-up it causes, inline.
    async fn drive(&mut self, request: Request) {
        let mut next = Some(request);
        while let Some(request) = next.take() {
            let outcome = execute(self.service.as_ref(), request).await;
            next = self.apply(outcome);
        }
    }

    pub async fn load_podcasts(&mut self) {
        let request = self.request_podcasts();
        self.drive(request).await;
    }

    pub async fn load_episodes(&mut self, page: u32) {
        let request = self.request_episodes(page);
        self.drive(request).await;
    }

    /// Reload the current page with the current filter.
    pub async fn reload(&mut self) {
        let request = self.request_reload();
        self.drive(request).await;
    }

    pub async fn mark_listened(&mut self, episode_id: Id) {
        let request = self.request_mark_listened(episode_id);
        self.drive(request).await;
    }

    pub async fn handle_refresh(&mut self) {
        if let Some(request) = self.request_refresh() {
            self.drive(request).await;
        }
    }

    pub async fn handle_filter_change(&mut self, podcast_filter: Option<Id>) {
        let request = self.request_filter_change(podcast_filter);
        self.drive(request).await;
    }

    pub async fn next_page(&mut self) {
        if let Some(request) = self.request_next_page() {
            self.drive(request).await;
        }
    }

    pub async fn previous_page(&mut self) {
        if let Some(request) = self.request_previous_page() {
            self.drive(request).await;
        }
    }

    pub async fn load_details(&mut self, episode_id: Id) {
        let request = self.request_details(episode_id);
        self.drive(request).await;
    }
}
