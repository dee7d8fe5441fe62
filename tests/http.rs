use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use client_hours_dashboard::config::UpstreamConfig;
use client_hours_dashboard::{router, AppState, DashboardConfig, TimeEntriesClient};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SummaryRow {
    tag: String,
    billable_hours: f64,
    non_billable_hours: f64,
    total_hours: f64,
    percent_billable: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DashboardView {
    start_date: String,
    end_date: String,
    selected_user: String,
    user_options: Vec<String>,
    error: Option<String>,
    notice: Option<String>,
    summary: Vec<SummaryRow>,
    charts: Vec<serde_json::Value>,
}

#[derive(Clone, Default)]
struct Upstream {
    hits: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

struct TestApp {
    base_url: String,
    upstream: Upstream,
}

impl TestApp {
    fn hits(&self) -> usize {
        self.upstream.hits.load(Ordering::SeqCst)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn time_entries(State(upstream): State<Upstream>) -> Response {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    if upstream.failing.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "err": "Internal error", "ECODE": "OAUTH_500" })),
        )
            .into_response();
    }
    Json(json!({
        "data": [
            {
                "id": "1",
                "task": { "id": "86a1" },
                "user": { "id": 1, "username": "alice" },
                "billable": true,
                "start": "1735722000000",
                "end": "1735729200000",
                "duration": "7200000",
                "tags": [{ "name": "Kamoa" }],
            },
            {
                "id": "2",
                "task": { "id": "86a2" },
                "user": { "id": 2, "username": "bob" },
                "billable": false,
                "start": "1735808400000",
                "end": "1735812000000",
                "duration": "3600000",
                "tags": [{ "name": "kamoa" }, { "name": "pmc" }, { "name": "internal" }],
            },
            {
                "id": "3",
                "user": { "id": 2, "username": "bob" },
                "billable": true,
                "duration": "1800000",
                "tags": [{ "name": "internal" }],
            },
        ]
    }))
    .into_response()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_app() -> TestApp {
    let upstream = Upstream::default();
    let upstream_url = serve(
        Router::new()
            .route("/api/v2/team/7/time_entries", get(time_entries))
            .with_state(upstream.clone()),
    )
    .await;

    let config = UpstreamConfig::new("pk_test", "7")
        .with_base_url(format!("{upstream_url}/api/v2"))
        .with_assignees("1,2")
        .with_max_retries(0)
        .with_timeout(Duration::from_secs(5));
    let client = TimeEntriesClient::new(config.clone()).unwrap();
    let base_url = serve(router(AppState::new(DashboardConfig::new(config), client))).await;

    TestApp { base_url, upstream }
}

fn browser() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

async fn view(client: &Client, url: String) -> DashboardView {
    let response = client.get(url).send().await.unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_index_renders_summary_table() {
    let app = spawn_app().await;
    let client = browser();

    let response = client
        .get(app.url("/?start=2025-01-01&end=2025-01-31"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("dashboard_session="));

    let html = response.text().await.unwrap();
    assert!(html.contains("Time Tracking Summary"));
    assert!(html.contains("<td>kamoa</td><td>2.00</td><td>1.00</td><td>3.00</td><td>66.67%</td>"));
    assert!(html.contains("<td>pmc</td><td>0.00</td><td>1.00</td><td>1.00</td><td>0.00%</td>"));
    assert!(!html.contains("<td>internal</td>"));
    assert!(html.contains(r#"<option value="All Users" selected>All Users</option>"#));
}

#[tokio::test]
async fn http_dashboard_view_matches_expected_totals() {
    let app = spawn_app().await;
    let client = browser();

    let view = view(&client, app.url("/api/dashboard?start=2025-01-01&end=2025-01-31")).await;
    assert_eq!(view.start_date, "2025-01-01");
    assert_eq!(view.end_date, "2025-01-31");
    assert_eq!(view.selected_user, "All Users");
    assert_eq!(view.user_options, vec!["All Users", "alice", "bob"]);
    assert!(view.error.is_none());
    assert!(view.notice.is_none());
    assert_eq!(view.charts.len(), 3);

    let kamoa = view.summary.iter().find(|row| row.tag == "kamoa").unwrap();
    assert_eq!(kamoa.billable_hours, 2.0);
    assert_eq!(kamoa.non_billable_hours, 1.0);
    assert_eq!(kamoa.total_hours, 3.0);
    assert!((kamoa.percent_billable.unwrap() - 66.67).abs() < 0.01);

    let pmc = view.summary.iter().find(|row| row.tag == "pmc").unwrap();
    assert_eq!(pmc.total_hours, 1.0);
    assert_eq!(pmc.percent_billable, Some(0.0));
}

#[tokio::test]
async fn http_user_filter_restricts_rows() {
    let app = spawn_app().await;
    let client = browser();

    let view = view(
        &client,
        app.url("/api/dashboard?start=2025-01-01&end=2025-01-31&user=alice"),
    )
    .await;
    assert_eq!(view.selected_user, "alice");
    assert_eq!(view.summary.len(), 1);
    assert_eq!(view.summary[0].tag, "kamoa");
    assert_eq!(view.summary[0].total_hours, 2.0);
    assert_eq!(view.charts.len(), 2);
    assert_eq!(view.charts[0]["title"], "Time Breakdown for alice");
    assert_eq!(view.charts[1]["kind"], "stacked_bar");
}

#[tokio::test]
async fn http_session_cache_is_reused_until_refresh() {
    let app = spawn_app().await;
    let client = browser();
    let january = "start=2025-01-01&end=2025-01-31";

    view(&client, app.url(&format!("/api/dashboard?{january}"))).await;
    view(&client, app.url(&format!("/api/dashboard?{january}&user=bob"))).await;
    assert_eq!(app.hits(), 1);

    let response = client
        .post(app.url(&format!("/api/refresh?{january}")))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(app.hits(), 2);

    view(&client, app.url("/api/dashboard?start=2025-02-01&end=2025-02-28")).await;
    assert_eq!(app.hits(), 3);

    // A second browser owns its own session.
    view(&browser(), app.url(&format!("/api/dashboard?{january}"))).await;
    assert_eq!(app.hits(), 4);
}

#[tokio::test]
async fn http_refresh_form_redirects_back_to_dashboard() {
    let app = spawn_app().await;
    let client = browser();

    let response = client
        .post(app.url("/refresh"))
        .form(&[("start", "2025-01-01"), ("end", "2025-01-31"), ("user", "bob")])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.url().path(), "/");
    assert_eq!(
        response.url().query(),
        Some("start=2025-01-01&end=2025-01-31&user=bob")
    );
    assert_eq!(app.hits(), 1);

    let html = response.text().await.unwrap();
    assert!(html.contains(r#"<option value="bob" selected>bob</option>"#));
}

#[tokio::test]
async fn http_upstream_failure_shows_notice_instead_of_failing() {
    let app = spawn_app().await;
    app.upstream.failing.store(true, Ordering::SeqCst);
    let client = browser();

    let view = view(&client, app.url("/api/dashboard?start=2025-01-01&end=2025-01-31")).await;
    let error = view.error.expect("error notice");
    assert!(error.contains("500"));
    assert!(error.contains("OAUTH_500"));
    assert!(view.notice.is_some());
    assert!(view.summary.is_empty());
    assert!(view.charts.is_empty());

    app.upstream.failing.store(false, Ordering::SeqCst);
    let response = client
        .post(app.url("/api/refresh?start=2025-01-01&end=2025-01-31"))
        .send()
        .await
        .unwrap();
    let view: DashboardView = response.json().await.unwrap();
    assert!(view.error.is_none());
    assert_eq!(view.summary.len(), 2);
}

#[tokio::test]
async fn http_rejects_inverted_dates() {
    let app = spawn_app().await;
    let response = browser()
        .get(app.url("/api/dashboard?start=2025-02-01&end=2025-01-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(app.hits(), 0);
}
