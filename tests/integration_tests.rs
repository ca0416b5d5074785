//! Integration tests for podcast-tracker.
//!
//! These tests run the HTTP client and the controller against an
//! in-process mock of the Podcast Tracker API.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use podcast_tracker::api::{ApiClient, EpisodeService};
use podcast_tracker::card::export_page;
use podcast_tracker::controller::{ALL_PODCASTS, EpisodeListController, ListView};
use podcast_tracker::error::AppError;
use podcast_tracker::types::{Id, ListQuery};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const EPISODE_COUNT: i64 = 25;

struct MockState {
    pending: Vec<i64>,
    list_queries: Vec<HashMap<String, String>>,
    listened_bodies: Vec<(String, Value)>,
    refresh_calls: usize,
}

type Shared = Arc<Mutex<MockState>>;

fn new_state() -> Shared {
    Arc::new(Mutex::new(MockState {
        pending: (1..=EPISODE_COUNT).collect(),
        list_queries: Vec::new(),
        listened_bodies: Vec::new(),
        refresh_calls: 0,
    }))
}

fn podcast_of(id: i64) -> i64 {
    if id % 2 == 0 { 2 } else { 1 }
}

fn episode_json(id: i64) -> Value {
    let podcast_id = podcast_of(id);
    let title = if id == 1 {
        "<script>alert(1)</script>".to_string()
    } else {
        format!("Episode {}", id)
    };
    json!({
        "id": id,
        "title": title,
        "description": "Notes & links",
        "pub_date": "2024-03-05T10:00:00",
        "duration": "42:00",
        "episode_url": format!("https://media.example.com/{}.mp3", id),
        "spotify_url": null,
        "podcast_id": podcast_id,
        "listened": false,
        "created_at": "2024-03-05T10:00:00",
        "podcast": {"id": podcast_id, "name": if podcast_id == 1 { "Daily" } else { "Weekly" }}
    })
}

async fn podcasts() -> Json<Value> {
    Json(json!([
        {"id": 1, "name": "Daily", "description": "Every day"},
        {"id": 2, "name": "Weekly", "spotify_url": "https://open.spotify.com/show/2"},
        {"id": 3, "name": "Silent"}
    ]))
}

async fn episodes(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.list_queries.push(params.clone());

    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let page_size: usize = params
        .get("page_size")
        .and_then(|p| p.parse().ok())
        .unwrap_or(20);
    let filter: Option<i64> = params.get("podcast_id").and_then(|p| p.parse().ok());

    let matching: Vec<i64> = state
        .pending
        .iter()
        .copied()
        .filter(|id| filter.is_none_or(|podcast| podcast_of(*id) == podcast))
        .collect();
    let total = matching.len();
    let total_pages = total.div_ceil(page_size).max(1);
    let items: Vec<Value> = matching
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|id| episode_json(*id))
        .collect();

    Json(json!({
        "episodes": items,
        "page": page,
        "page_size": page_size,
        "total": total,
        "total_pages": total_pages
    }))
}

async fn episode(Path(id): Path<i64>) -> Result<Json<Value>, StatusCode> {
    if (1..=EPISODE_COUNT).contains(&id) {
        Ok(Json(episode_json(id)))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn mark_listened(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let parsed: i64 = id.parse().map_err(|_| StatusCode::NOT_FOUND)?;
    let mut state = state.lock().unwrap();
    if !state.pending.contains(&parsed) {
        return Err(StatusCode::NOT_FOUND);
    }
    state.listened_bodies.push((id, body));
    state.pending.retain(|pending| *pending != parsed);
    let mut episode = episode_json(parsed);
    episode["listened"] = json!(true);
    Ok(Json(episode))
}

async fn refresh(State(state): State<Shared>) -> Json<Value> {
    state.lock().unwrap().refresh_calls += 1;
    Json(json!({"message": "Refreshed 3 podcasts", "new_episodes": 0}))
}

async fn spawn_server(state: Shared) -> String {
    let app = Router::new()
        .route("/api/podcasts", get(podcasts))
        .route("/api/podcasts/refresh", post(refresh))
        .route("/api/episodes", get(episodes))
        .route("/api/episodes/:id", get(episode))
        .route("/api/episodes/:id/listened", patch(mark_listened))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> ApiClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    ApiClient::with_client(base_url, http).unwrap()
}

fn controller(base_url: &str) -> EpisodeListController {
    let service: Arc<dyn EpisodeService> = Arc::new(client(base_url));
    EpisodeListController::new(service)
}

/// List requests carry the page, the fixed page size and the filter.
#[tokio::test]
async fn test_list_request_parameters() {
    let state = new_state();
    let base_url = spawn_server(state.clone()).await;
    let api = client(&base_url);

    let result = api
        .fetch_episodes(&ListQuery::new(1, Some(Id::Number(1))))
        .await
        .unwrap();
    assert_eq!(result.total, 13);
    assert_eq!(result.episodes.len(), 13);

    api.fetch_episodes(&ListQuery::new(2, None)).await.unwrap();

    let queries = state.lock().unwrap().list_queries.clone();
    assert_eq!(queries[0].get("page").map(String::as_str), Some("1"));
    assert_eq!(queries[0].get("page_size").map(String::as_str), Some("20"));
    assert_eq!(queries[0].get("podcast_id").map(String::as_str), Some("1"));
    assert_eq!(queries[1].get("page").map(String::as_str), Some("2"));
    assert!(!queries[1].contains_key("podcast_id"));
}

/// Marking an episode sends `{"listened": true}` to the episode's URL.
#[tokio::test]
async fn test_mark_listened_request_body() {
    let state = new_state();
    let base_url = spawn_server(state.clone()).await;

    client(&base_url).mark_listened(&Id::Number(5)).await.unwrap();

    let bodies = state.lock().unwrap().listened_bodies.clone();
    assert_eq!(bodies, vec![("5".to_string(), json!({"listened": true}))]);
}

#[tokio::test]
async fn test_refresh_and_podcast_list() {
    let state = new_state();
    let base_url = spawn_server(state.clone()).await;
    let api = client(&base_url);

    let response = api.refresh_podcasts().await.unwrap();
    assert_eq!(response.message, "Refreshed 3 podcasts");
    assert_eq!(response.new_episodes, Some(0));
    assert_eq!(state.lock().unwrap().refresh_calls, 1);

    let podcasts = api.fetch_podcasts().await.unwrap();
    assert_eq!(podcasts.len(), 3);
    assert_eq!(podcasts[1].spotify_url.as_deref(), Some("https://open.spotify.com/show/2"));
}

#[tokio::test]
async fn test_missing_episode_is_status_error() {
    let base_url = spawn_server(new_state()).await;
    let api = client(&base_url);

    let episode = api.fetch_episode(&Id::Number(3)).await.unwrap();
    assert_eq!(episode.podcast_name(), "Daily");

    let err = api.fetch_episode(&Id::Number(999)).await.unwrap_err();
    assert!(matches!(err, AppError::Status(404)));
    assert!(err.is_status());
}

/// Browse, mark one episode as listened and refresh, as a user would.
#[tokio::test]
async fn test_controller_session() {
    let state = new_state();
    let base_url = spawn_server(state.clone()).await;
    let mut controller = controller(&base_url);

    controller.load_podcasts().await;
    let labels: Vec<&str> = controller
        .filter_options()
        .iter()
        .map(|option| option.label.as_str())
        .collect();
    assert_eq!(labels, vec![ALL_PODCASTS, "Daily", "Weekly", "Silent"]);
    assert_eq!(controller.total_podcasts(), Some(3));

    controller.load_episodes(1).await;
    assert_eq!(controller.episodes().len(), 20);
    let pagination = *controller.pagination().unwrap();
    assert_eq!(pagination.label(), "Page 1 of 2");
    assert!(!pagination.previous_enabled);
    assert!(pagination.next_enabled);

    controller.next_page().await;
    assert_eq!(controller.current_page(), 2);
    assert_eq!(controller.episodes().len(), 5);
    assert!(!controller.pagination().unwrap().next_enabled);

    let first = controller.episodes()[0].id.clone();
    let before = state.lock().unwrap().list_queries.len();
    controller.mark_listened(first).await;
    let after = state.lock().unwrap().list_queries.len();
    assert_eq!(after, before + 1);
    assert_eq!(controller.current_page(), 2);
    assert_eq!(controller.episodes().len(), 4);
    assert_eq!(controller.total_episodes(), Some(24));

    controller.handle_refresh().await;
    assert!(controller.refresh_control().enabled);
    assert_eq!(
        controller.active_notification().map(|n| n.message.as_str()),
        Some("Refreshed 3 podcasts")
    );
}

#[tokio::test]
async fn test_filter_without_episodes_shows_empty_state() {
    let base_url = spawn_server(new_state()).await;
    let mut controller = controller(&base_url);

    controller.load_episodes(1).await;
    controller.next_page().await;
    assert_eq!(controller.current_page(), 2);

    controller.handle_filter_change(Some(Id::Number(3))).await;
    assert_eq!(controller.current_page(), 1);
    assert_eq!(*controller.view(), ListView::Empty);
    assert!(controller.pagination().is_none());
    assert_eq!(controller.total_episodes(), Some(0));
}

#[tokio::test]
async fn test_unreachable_server_keeps_idle_view() {
    let mut controller = controller("http://127.0.0.1:1");

    controller.load_podcasts().await;
    controller.load_episodes(1).await;

    assert_eq!(*controller.view(), ListView::Idle);
    assert_eq!(controller.filter_options().len(), 1);
    assert!(!controller.is_loading());
}

/// Server text is escaped in the exported page.
#[tokio::test]
async fn test_export_escapes_server_text() {
    let base_url = spawn_server(new_state()).await;
    let mut controller = controller(&base_url);
    controller.load_podcasts().await;
    controller.load_episodes(1).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.html");
    export_page(&controller, &path, &Utc::now(), &Utc).unwrap();

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("Notes &amp; links"));
    assert!(html.contains("Page 1 of 2"));
    assert!(html.contains("25 pending episodes"));
}
