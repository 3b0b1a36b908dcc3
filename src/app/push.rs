use crate::codec::base64url_decode;
use crate::ports::store::SubscriptionStore;
use crate::push::ece::{AUTH_SECRET_LEN, PUBLIC_KEY_LEN};
use crate::push::queue::JobEntry;
use crate::push::vapid::audience_for;
use crate::state;
use crate::types::notification::{MatchEvent, NotificationKind};
use crate::types::push::{Subscription, SubscriptionRecord};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn push_disabled() -> ApiError {
    api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "Push notifications are not configured.",
    )
}

fn store_failure(err: impl std::fmt::Display) -> ApiError {
    tracing::error!("subscription store error: {err}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Subscription store unavailable.")
}

#[derive(Serialize, Deserialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_vapid_key(
    State(state): State<state::AppState>,
    Path(_tournament_id): Path<i64>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let push = state.push.as_ref().ok_or_else(push_disabled)?;
    Ok(Json(PublicKeyResponse {
        public_key: push.fanout().vapid().public_key_b64().to_string(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SubscribeRequest {
    pub(crate) subscription: SubscriptionBody,
    pub(crate) name: String,
    pub(crate) phone: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SubscriptionBody {
    pub(crate) endpoint: String,
    pub(crate) keys: SubscriptionKeysBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SubscriptionKeysBody {
    pub(crate) p256dh: String,
    pub(crate) auth: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct SuccessResponse {
    pub(crate) success: bool,
}

pub(crate) async fn push_subscribe(
    State(state): State<state::AppState>,
    Path(tournament_id): Path<i64>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let name = request.name.trim();
    let endpoint = request.subscription.endpoint.trim();
    let keys = &request.subscription.keys;
    if name.is_empty()
        || endpoint.is_empty()
        || keys.p256dh.trim().is_empty()
        || keys.auth.trim().is_empty()
    {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "subscription endpoint, keys and name are required.",
        ));
    }
    if let Err(err) = audience_for(endpoint) {
        tracing::debug!("rejected subscription: {err}");
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "subscription endpoint must be an http(s) URL.",
        ));
    }
    validate_subscription_keys(&keys.p256dh, &keys.auth)
        .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;

    let record = SubscriptionRecord {
        tournament_id,
        participant_name: name.to_string(),
        participant_phone: request.phone.trim().to_string(),
        subscription: Subscription::new(endpoint, keys.p256dh.trim(), keys.auth.trim()),
    };
    state
        .store
        .upsert_subscription(record)
        .await
        .map_err(store_failure)?;
    tracing::info!(tournament_id, participant = %name, "push subscription stored");

    Ok(Json(SuccessResponse { success: true }))
}

fn validate_subscription_keys(p256dh: &str, auth: &str) -> Result<(), &'static str> {
    match base64url_decode(p256dh) {
        Ok(point) if point.len() == PUBLIC_KEY_LEN && point[0] == 0x04 => {}
        _ => return Err("p256dh must be a base64url uncompressed P-256 point."),
    }
    match base64url_decode(auth) {
        Ok(secret) if secret.len() == AUTH_SECRET_LEN => Ok(()),
        _ => Err("auth must be a base64url 16-byte secret."),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct UnsubscribeRequest {
    pub(crate) endpoint: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct UnsubscribeResponse {
    pub(crate) success: bool,
    pub(crate) removed: bool,
}

pub(crate) async fn push_unsubscribe(
    State(state): State<state::AppState>,
    Path(tournament_id): Path<i64>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    let endpoint = request.endpoint.trim();
    if endpoint.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "endpoint is required."));
    }
    let removed = state
        .store
        .remove_subscription(tournament_id, endpoint)
        .await
        .map_err(store_failure)?;

    Ok(Json(UnsubscribeResponse {
        success: true,
        removed,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusQuery {
    pub(crate) name: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct StatusResponse {
    pub(crate) subscribed: bool,
}

pub(crate) async fn push_status(
    State(state): State<state::AppState>,
    Path(tournament_id): Path<i64>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let name = query.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Ok(Json(StatusResponse { subscribed: false }));
    }
    let subscriptions = state
        .store
        .subscriptions_for(tournament_id, name)
        .await
        .map_err(store_failure)?;

    Ok(Json(StatusResponse {
        subscribed: !subscriptions.is_empty(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TestPushRequest {
    pub(crate) name: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct TestPushResponse {
    pub(crate) success: bool,
    pub(crate) sent: usize,
    pub(crate) failed: usize,
}

pub(crate) async fn push_test(
    State(state): State<state::AppState>,
    Path(tournament_id): Path<i64>,
    Json(request): Json<TestPushRequest>,
) -> Result<Json<TestPushResponse>, ApiError> {
    let push = state.push.as_ref().ok_or_else(push_disabled)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "name is required."));
    }

    let report = push
        .fanout()
        .notify_test(tournament_id, name)
        .await
        .map_err(store_failure)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No push subscriptions found."))?;

    Ok(Json(TestPushResponse {
        success: true,
        sent: report.sent,
        failed: report.failed,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotifyRequest {
    pub(crate) court_number: u32,
    pub(crate) team1: String,
    pub(crate) team2: String,
    pub(crate) kind: NotificationKind,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotifyResponse {
    pub(crate) queued: bool,
    pub(crate) job_id: Option<u64>,
}

/// Hook for match state changes. Delivery runs after the response is sent.
pub(crate) async fn match_notify(
    State(state): State<state::AppState>,
    Path((tournament_id, match_id)): Path<(i64, i64)>,
    Json(request): Json<NotifyRequest>,
) -> Result<(StatusCode, Json<NotifyResponse>), ApiError> {
    let push = state.push.as_ref().ok_or_else(push_disabled)?;
    let event = MatchEvent {
        tournament_id,
        match_id,
        court_number: request.court_number,
        team1: request.team1,
        team2: request.team2,
        kind: request.kind,
    };
    let job_id = push.enqueue(event).map(|job| job.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(NotifyResponse {
            queued: job_id.is_some(),
            job_id,
        }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PushJobsDebugResponse {
    pub(crate) server_time: OffsetDateTime,
    pub(crate) enabled: bool,
    pub(crate) jobs: Vec<JobEntry>,
}

pub(crate) async fn push_jobs_debug(
    State(state): State<state::AppState>,
) -> Json<PushJobsDebugResponse> {
    let jobs = state
        .push
        .as_ref()
        .map(|push| push.recent_jobs())
        .unwrap_or_default();
    Json(PushJobsDebugResponse {
        server_time: OffsetDateTime::now_utc(),
        enabled: state.push.is_some(),
        jobs,
    })
}
