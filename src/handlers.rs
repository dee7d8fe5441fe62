use crate::errors::AppError;
use crate::models::{DashboardQuery, DashboardView, DateRange, UserFilter};
use crate::presenter::build_view;
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::Utc;
use reqwest::Url;
use tracing::debug;

pub const SESSION_COOKIE: &str = "dashboard_session";

struct ViewRequest {
    range: DateRange,
    user: UserFilter,
}

impl ViewRequest {
    fn parse(query: &DashboardQuery) -> Result<Self, AppError> {
        let today = Utc::now().date_naive();
        let range = DateRange::from_inputs(query.start.as_deref(), query.end.as_deref(), today)
            .map_err(AppError::bad_request)?;
        Ok(Self {
            range,
            user: UserFilter::parse(query.user.as_deref()),
        })
    }
}

pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let request = ViewRequest::parse(&query)?;
    let (cookie, view) = run_dashboard(&state, &headers, &request, false).await;
    Ok(with_session_cookie(Html(render_index(&view)).into_response(), cookie))
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<DashboardQuery>,
) -> Result<Response, AppError> {
    let request = ViewRequest::parse(&form)?;
    let (cookie, _) = run_dashboard(&state, &headers, &request, true).await;
    let location = dashboard_location(&request)?;
    Ok(with_session_cookie(Redirect::to(&location).into_response(), cookie))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let request = ViewRequest::parse(&query)?;
    let (cookie, view) = run_dashboard(&state, &headers, &request, false).await;
    Ok(with_session_cookie(Json(view).into_response(), cookie))
}

pub async fn refresh_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let request = ViewRequest::parse(&query)?;
    let (cookie, view) = run_dashboard(&state, &headers, &request, true).await;
    Ok(with_session_cookie(Json(view).into_response(), cookie))
}

/// Serves the view from the session cache, refetching on first use, on an
/// explicit refresh, or when the requested range differs from the cached one.
/// Returns the session id when a new cookie must be set.
async fn run_dashboard(
    state: &AppState,
    headers: &HeaderMap,
    request: &ViewRequest,
    force_refresh: bool,
) -> (Option<String>, DashboardView) {
    let lease = state.sessions.checkout(session_cookie(headers).as_deref()).await;
    let mut slot = lease.slot.lock().await;

    let session = match slot.session.take() {
        Some(cached) if !force_refresh && cached.range == request.range => cached,
        cached => {
            debug!(
                session = %lease.id,
                refresh = force_refresh,
                had_cache = cached.is_some(),
                "loading time entries for session"
            );
            state.load(request.range).await
        }
    };
    let view = build_view(&session, &state.config.allow_list, &request.user);
    slot.session = Some(session);

    (lease.created.then(|| lease.id.clone()), view)
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then(|| value.to_string())
        })
}

fn with_session_cookie(mut response: Response, session_id: Option<String>) -> Response {
    if let Some(id) = session_id {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn dashboard_location(request: &ViewRequest) -> Result<String, AppError> {
    let url = Url::parse_with_params(
        "http://dashboard.local/",
        &[
            ("start", request.range.start_label()),
            ("end", request.range.end_label()),
            ("user", request.user.label().to_string()),
        ],
    )
    .map_err(AppError::internal)?;
    Ok(format!("/?{}", url.query().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; dashboard_session=abc-123"));
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc-123"));

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn refresh_redirect_keeps_controls() {
        let query = DashboardQuery {
            start: Some("2025-01-01".to_string()),
            end: Some("2025-01-31".to_string()),
            user: Some("mary ann".to_string()),
        };
        let request = ViewRequest::parse(&query).unwrap();
        assert_eq!(
            dashboard_location(&request).unwrap(),
            "/?start=2025-01-01&end=2025-01-31&user=mary+ann"
        );
    }

    #[test]
    fn inverted_range_is_a_bad_request() {
        let query = DashboardQuery {
            start: Some("2025-02-01".to_string()),
            end: Some("2025-01-01".to_string()),
            user: None,
        };
        let err = ViewRequest::parse(&query).err().unwrap();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
