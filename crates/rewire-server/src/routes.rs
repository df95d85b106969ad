use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use rewire_core::{generate_token, ExpectationType, ObservationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::bearer_matches;
use crate::error::ServerError;
use crate::state::AppState;

/// Builds the full Ingress router from SPEC_FULL.md §4.4/§6.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/observe/{id}", get(observe_get).post(observe_post))
        .route("/ack/{trial_id}", get(ack))
        .route("/admin/new", post(admin_new))
        .route("/admin/enable", post(admin_enable))
        .route("/admin/disable", post(admin_disable))
        .with_state(state)
}

async fn status() -> &'static str {
    "rewire ok\n"
}

#[derive(Serialize)]
struct ObservationView {
    kind: String,
    observed_at: i64,
    meta: Option<String>,
}

#[derive(Serialize)]
struct ExpectationView {
    id: String,
    r#type: String,
    name: String,
    expected_interval_s: i64,
    tolerance_s: i64,
    params: Value,
    owner_email: String,
    is_enabled: bool,
    recent_observations: Vec<ObservationView>,
}

async fn observe_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExpectationView>, ServerError> {
    let exp = state
        .store
        .get_expectation(&id)
        .await?
        .ok_or_else(|| ServerError::UnknownExpectation(id.clone()))?;
    let observations = state.store.recent_observations(&id, 10).await?;

    Ok(Json(ExpectationView {
        id: exp.id,
        r#type: exp.exp_type.as_str().to_string(),
        name: exp.name,
        expected_interval_s: exp.expected_interval_s,
        tolerance_s: exp.tolerance_s,
        params: serde_json::to_value(&exp.params).unwrap_or(Value::Null),
        owner_email: exp.owner_email,
        is_enabled: exp.enabled,
        recent_observations: observations
            .into_iter()
            .map(|o| ObservationView {
                kind: o.kind.as_str().to_string(),
                observed_at: o.observed_at,
                meta: o.meta,
            })
            .collect(),
    }))
}

#[derive(Deserialize)]
struct ObservePostForm {
    kind: String,
    meta: Option<String>,
}

async fn observe_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ObservePostForm>,
) -> Result<(StatusCode, &'static str), ServerError> {
    state
        .store
        .get_expectation(&id)
        .await?
        .ok_or_else(|| ServerError::UnknownExpectation(id.clone()))?;

    let kind: ObservationKind = form
        .kind
        .parse()
        .map_err(|_| ServerError::BadRequest("kind must be start|end|ping|ack".to_string()))?;

    state.store.add_observation(&id, kind, form.meta.as_deref()).await?;
    Ok((StatusCode::OK, "ok\n"))
}

async fn ack(
    State(state): State<AppState>,
    Path(trial_id): Path<String>,
) -> Result<(StatusCode, &'static str), ServerError> {
    if state.store.ack_trial(&trial_id).await? {
        Ok((StatusCode::OK, "acked\n"))
    } else {
        Err(ServerError::UnknownOrNotPendingTrial(trial_id))
    }
}

fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<(), ServerError> {
    let header_value = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if bearer_matches(header_value, &state.admin_token) {
        Ok(())
    } else {
        Err(ServerError::Unauthorized)
    }
}

#[derive(Deserialize)]
struct AdminNewForm {
    r#type: String,
    name: String,
    email: String,
    expected_interval_s: i64,
    tolerance_s: i64,
    params_json: String,
}

#[derive(Serialize)]
struct AdminNewResponse {
    id: String,
    observe_url: String,
}

async fn admin_new(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AdminNewForm>,
) -> Result<Json<AdminNewResponse>, ServerError> {
    require_admin(&headers, &state)?;

    let exp_type: ExpectationType = form
        .r#type
        .parse()
        .map_err(|_| ServerError::BadRequest("type must be schedule|alert_path".to_string()))?;
    if form.name.trim().is_empty() || form.email.trim().is_empty() {
        return Err(ServerError::BadRequest("need name,email,expected_interval_s>=60".to_string()));
    }

    let id = generate_token(16);
    state
        .store
        .create_expectation(
            &id,
            exp_type,
            &form.name,
            &form.email,
            form.expected_interval_s,
            form.tolerance_s,
            &form.params_json,
        )
        .await?;

    let observe_url = format!("{}/observe/{}", state.base_url.trim_end_matches('/'), id);
    Ok(Json(AdminNewResponse { id, observe_url }))
}

#[derive(Deserialize)]
struct AdminIdForm {
    id: String,
}

#[derive(Serialize)]
struct AdminEnableResponse {
    ok: bool,
    enabled: bool,
}

async fn admin_enable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AdminIdForm>,
) -> Result<Json<AdminEnableResponse>, ServerError> {
    set_enabled(state, headers, form, true).await
}

async fn admin_disable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AdminIdForm>,
) -> Result<Json<AdminEnableResponse>, ServerError> {
    set_enabled(state, headers, form, false).await
}

async fn set_enabled(
    state: AppState,
    headers: HeaderMap,
    form: AdminIdForm,
    enabled: bool,
) -> Result<Json<AdminEnableResponse>, ServerError> {
    require_admin(&headers, &state)?;
    if form.id.trim().is_empty() {
        return Err(ServerError::BadRequest("need id".to_string()));
    }
    // Matches the reference server's semantics: enabling/disabling an
    // unknown id is still reported as `ok: true` rather than 404 — the
    // admin surface trusts its own previously-issued ids.
    state.store.set_enabled(&form.id, enabled).await?;
    Ok(Json(AdminEnableResponse { ok: true, enabled }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rewire_store::SqliteStore;
    use tower::ServiceExt;

    async fn test_app() -> (Router, AppState) {
        let store = SqliteStore::in_memory().await.expect("in-memory store");
        let state = AppState::new(store, "admin-secret".to_string(), "http://localhost:8080".to_string());
        (router(state.clone()), state)
    }

    #[tokio::test]
    async fn status_is_public_and_ok() {
        let (app, _state) = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn observe_get_unknown_expectation_is_404() {
        let (app, _state) = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/observe/no-such-id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_new_requires_bearer_auth() {
        let (app, _state) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/new")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("type=schedule&name=x&email=o@example.com&expected_interval_s=60&tolerance_s=0&params_json=%7B%7D"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_new_then_observe_round_trips() {
        let (app, _state) = test_app().await;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/new")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .header("authorization", "Bearer admin-secret")
                    .body(Body::from("type=schedule&name=nightly&email=o@example.com&expected_interval_s=60&tolerance_s=0&params_json=%7B%7D"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: AdminNewResponse = serde_json::from_slice(&body).unwrap();

        let observe_response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/observe/{}", created.id))
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("kind=start"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(observe_response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn observe_post_rejects_bad_kind() {
        let (app, state) = test_app().await;
        state
            .store
            .create_expectation("exp-1", ExpectationType::Schedule, "n", "o@example.com", 60, 0, "{}")
            .await
            .unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/observe/exp-1")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("kind=bogus"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ack_unknown_trial_is_404() {
        let (app, _state) = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/ack/no-such-trial").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
