//! End-to-end tests against an in-process mock backend.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uidai_dashboard::api::{ApiClient, Backend, FailureCause};
use uidai_dashboard::charts::{CRISIS_PANEL, STATES_PANEL};
use uidai_dashboard::chat::{ChatSession, Language, SendOutcome};
use uidai_dashboard::dashboard::Panel;
use uidai_dashboard::terminal::{self, Screen};
use uidai_dashboard::{App, AppView, ChartRegistry, Config, KeyEvent, TuiChartSurface};

#[derive(Clone, Copy, PartialEq)]
enum CrisisMode {
    Ok,
    /// Never answers; the client's timeout turns this into a transport failure
    Hang,
    ServerError,
    Malformed,
}

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    query: Option<String>,
    content_type: Option<String>,
}

struct MockState {
    healthy: bool,
    crisis: CrisisMode,
    seen: Mutex<Vec<Seen>>,
    questions: Mutex<Vec<String>>,
}

type Mock = Arc<MockState>;

fn mock(healthy: bool, crisis: CrisisMode) -> Mock {
    Arc::new(MockState {
        healthy,
        crisis,
        seen: Mutex::new(Vec::new()),
        questions: Mutex::new(Vec::new()),
    })
}

fn record(state: &MockState, uri: &Uri, headers: &HeaderMap) {
    state.seen.lock().unwrap().push(Seen {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
}

#[derive(Deserialize)]
struct Limit {
    limit: usize,
}

async fn health(State(state): State<Mock>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    record(&state, &uri, &headers);
    let status = if state.healthy { "healthy" } else { "unhealthy" };
    Json(json!({"status": status, "database": true, "langchain": true}))
}

async fn metrics(State(state): State<Mock>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    record(&state, &uri, &headers);
    Json(json!({
        "total_enrollments": 25_000_000u64,
        "total_bio_updates": 450_000_000u64,
        "total_demo_updates": 120_000_000u64,
        "national_bio_ratio": 18.0,
        "national_demo_ratio": 4.8,
        "crisis_districts_count": 3
    }))
}

async fn states(
    State(state): State<Mock>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<Limit>,
) -> Json<Value> {
    record(&state, &uri, &headers);
    let rows: Vec<Value> = (0..params.limit)
        .map(|i| json!({"state": format!("State {i}"), "bio_ratio": 45.0 - i as f64}))
        .collect();
    Json(Value::Array(rows))
}

async fn crisis_districts(State(state): State<Mock>, uri: Uri, headers: HeaderMap) -> Response {
    record(&state, &uri, &headers);
    match state.crisis {
        CrisisMode::Ok => Json(json!([
            {"state": "Bihar", "district": "Patna", "enrollments": 1200, "bio_updates": 54000, "bio_ratio": 45.0, "z_score": 3.6},
            {"state": "Assam", "district": "Dhubri", "enrollments": 900, "bio_updates": 30000, "bio_ratio": 33.3, "z_score": 2.8},
            {"state": "Bihar", "district": "Gaya", "enrollments": 800, "bio_updates": 24000, "bio_ratio": 30.0, "z_score": null}
        ]))
        .into_response(),
        CrisisMode::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        CrisisMode::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        CrisisMode::Malformed => (StatusCode::OK, "<html>oops</html>").into_response(),
    }
}

async fn filters(State(state): State<Mock>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    record(&state, &uri, &headers);
    Json(json!({"states": ["Assam", "Bihar"]}))
}

async fn chat(
    State(state): State<Mock>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, &uri, &headers);
    let question = body["question"].as_str().unwrap_or_default().to_string();
    state.questions.lock().unwrap().push(question.clone());

    if question.contains("chart") {
        Json(json!({
            "success": true,
            "answer": "Top states by bio ratio",
            "chart_data": {
                "type": "bar",
                "data": {"labels": ["Bihar", "Assam"], "datasets": [{"label": "Bio Ratio", "data": [45.0, 33.3]}]}
            }
        }))
    } else {
        Json(json!({"success": true, "answer": format!("You asked: {question}")}))
    }
}

async fn spawn_backend(state: Mock) -> String {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/dashboard/metrics", get(metrics))
        .route("/api/dashboard/states", get(states))
        .route("/api/dashboard/crisis-districts", get(crisis_districts))
        .route("/api/dashboard/filters", get(filters))
        .route("/api/chat/", post(chat))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base_url: String) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url;
    config.api.request_timeout_secs = Some(1);
    config
}

fn new_app(config: Config) -> (App, Arc<TuiChartSurface>) {
    let api = Arc::new(ApiClient::from_config(&config.api).unwrap());
    let surface = Arc::new(TuiChartSurface::new());
    (App::new(config, api, surface.clone()), surface)
}

#[tokio::test]
async fn test_healthy_backend_populates_every_panel() {
    let state = mock(true, CrisisMode::Ok);
    let (mut app, surface) = new_app(config(spawn_backend(state.clone()).await));

    app.start().await.unwrap();
    assert_eq!(app.view(), &AppView::Main);

    let snapshot = app.dashboard().unwrap().snapshot().await;
    assert!(snapshot.failed_panels().is_empty());

    let cards = snapshot.metrics.ready().unwrap();
    assert_eq!(cards.len(), 6);
    assert_eq!(cards[0].value, "2.50Cr");
    assert_eq!(snapshot.states_chart.ready().unwrap().len(), 15);
    assert_eq!(snapshot.crisis_chart.ready().unwrap().len(), 3);
    assert_eq!(snapshot.crisis_table.ready().unwrap()[0].badge.label(), "EXTREME");
    assert_eq!(snapshot.filters.ready().unwrap().choices.len(), 3);

    let table = snapshot.crisis_table.ready().unwrap();
    assert_eq!(table[2].district, "Gaya");
    assert_eq!(table[2].z_score, "-");

    assert_eq!(surface.chart(STATES_PANEL).unwrap().labels[0], "State 0");
    let crisis = surface.chart(CRISIS_PANEL).unwrap();
    assert_eq!(crisis.labels[0], "Patna, Bihar");
    assert_eq!(crisis.datasets[0].data[2], 0.0);

    let seen = state.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 5);
    assert!(seen
        .iter()
        .all(|s| s.content_type.as_deref() == Some("application/json")));
    let query_of = |path: &str| {
        seen.iter()
            .find(|s| s.path == path)
            .and_then(|s| s.query.clone())
    };
    assert_eq!(query_of("/api/dashboard/states").as_deref(), Some("limit=20"));
    assert_eq!(
        query_of("/api/dashboard/crisis-districts").as_deref(),
        Some("limit=30")
    );

    app.shutdown().await;
    assert!(surface.live_panels().is_empty());
}

#[tokio::test]
async fn test_crisis_transport_failure_is_isolated() {
    let state = mock(true, CrisisMode::Hang);
    let (mut app, surface) = new_app(config(spawn_backend(state).await));

    app.start().await.unwrap();
    let snapshot = app.dashboard().unwrap().snapshot().await;

    assert_eq!(snapshot.failed_panels(), vec![Panel::Crisis]);
    assert!(snapshot.crisis_chart.is_failed());
    assert!(snapshot.crisis_table.is_failed());
    assert!(snapshot.metrics.is_ready());
    assert!(snapshot.states_chart.is_ready());
    assert!(snapshot.filters.is_ready());
    assert!(surface.chart(STATES_PANEL).is_some());
    assert!(surface.chart(CRISIS_PANEL).is_none());
}

#[tokio::test]
async fn test_status_and_decode_failures_are_uniform() {
    let server_error = spawn_backend(mock(true, CrisisMode::ServerError)).await;
    let client = ApiClient::new(&server_error, None).unwrap();
    let err = client.crisis_districts(30).await.unwrap_err();
    assert_eq!(err.status, Some(500));
    assert!(matches!(err.cause, FailureCause::Status(500)));

    let malformed = spawn_backend(mock(true, CrisisMode::Malformed)).await;
    let client = ApiClient::new(&malformed, None).unwrap();
    let err = client.crisis_districts(30).await.unwrap_err();
    assert_eq!(err.status, Some(200));
    assert!(matches!(err.cause, FailureCause::Decode(_)));
}

#[tokio::test]
async fn test_unhealthy_backend_shows_fatal_view() {
    let state = mock(false, CrisisMode::Ok);
    let (mut app, _surface) = new_app(config(spawn_backend(state.clone()).await));

    assert!(app.start().await.is_err());
    assert!(matches!(app.view(), AppView::Fatal { .. }));
    assert!(app.dashboard().is_none());

    // Nothing beyond the health check was requested
    assert_eq!(state.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_filter_does_not_refetch() {
    let state = mock(true, CrisisMode::Ok);
    let (mut app, surface) = new_app(config(spawn_backend(state.clone()).await));
    app.start().await.unwrap();
    let dashboard = app.dashboard().unwrap();
    let requests = state.seen.lock().unwrap().len();

    dashboard.apply_filter(Some("Assam".to_string())).await;
    let rows = dashboard.snapshot().await.crisis_table.ready().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].district, "Dhubri");
    assert_eq!(surface.chart(CRISIS_PANEL).unwrap().labels, vec!["Dhubri, Assam"]);

    dashboard.apply_filter(None).await;
    assert_eq!(dashboard.crisis_view().await.len(), 3);
    assert_eq!(state.seen.lock().unwrap().len(), requests);
}

#[tokio::test]
async fn test_chat_round_trip_with_chart() {
    let state = mock(true, CrisisMode::Ok);
    let base_url = spawn_backend(state.clone()).await;
    let api = Arc::new(ApiClient::new(&base_url, None).unwrap());
    let surface = Arc::new(TuiChartSurface::new());
    let chat = ChatSession::new(
        api,
        ChartRegistry::shared(surface.clone()),
        Language::Telugu,
        Duration::from_secs(3),
    );

    let outcome = chat.send_message("Show a chart of states").await;
    assert_eq!(outcome, SendOutcome::Answered);
    assert_eq!(
        state.questions.lock().unwrap()[0],
        "Show a chart of states (తెలుగులో సమాధానం ఇవ్వండి)"
    );

    let messages = chat.messages().await;
    assert_eq!(messages[0].content, "Show a chart of states");
    let slot = messages[1].chart.clone().unwrap();

    chat.bind_chart(&slot.panel_id).await.unwrap();
    assert_eq!(surface.chart(&slot.panel_id).unwrap().labels, vec!["Bihar", "Assam"]);
}

#[tokio::test]
async fn test_screen_follows_chat_shortcut() {
    let state = mock(true, CrisisMode::Ok);
    let (mut app, surface) = new_app(config(spawn_backend(state).await));
    app.start().await.unwrap();

    let screen = Screen::capture(&app).await;
    assert!(screen.chat.is_none());
    let text = terminal::render_to_string(160, 60, |frame| {
        terminal::draw_screen(frame, &screen, &surface)
    })
    .unwrap();
    assert!(text.contains("Patna"));
    assert!(!text.contains("AI Assistant"));

    assert!(app.handle_key(KeyEvent::ctrl('k')).await);
    let screen = Screen::capture(&app).await;
    assert!(screen.chat.is_some());
    let text = terminal::render_to_string(160, 60, |frame| {
        terminal::draw_screen(frame, &screen, &surface)
    })
    .unwrap();
    assert!(text.contains("AI Assistant (English)"));

    assert!(app.handle_key(KeyEvent::plain(uidai_dashboard::Key::Escape)).await);
    assert!(Screen::capture(&app).await.chat.is_none());

    app.shutdown().await;
}
