use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{RedemptionId, TransitionError, UserId};
use super::events::RewardEvent;
use super::ledger::{LedgerError, RewardLedger};
use super::service::{RedemptionRequest, RewardService, RewardServiceError};

/// Router builder exposing the rewards REST surface.
///
/// Admin list/summary endpoints are mounted under both path prefixes the
/// storefront consoles use.
pub fn rewards_router<L>(service: Arc<RewardService<L>>) -> Router
where
    L: RewardLedger + 'static,
{
    Router::new()
        .route("/rewards/me", get(profile_handler::<L>))
        .route("/rewards/me/vouchers", post(create_voucher_handler::<L>))
        .route(
            "/rewards/me/redemptions",
            get(my_redemptions_handler::<L>).post(create_redemption_handler::<L>),
        )
        .route("/rewards/admin/summary", get(admin_summary_handler::<L>))
        .route("/admin/rewards/summary", get(admin_summary_handler::<L>))
        .route(
            "/rewards/admin/redemptions",
            get(admin_redemptions_handler::<L>),
        )
        .route("/admin/redemptions", get(admin_redemptions_handler::<L>))
        .route(
            "/rewards/admin/redemptions/:redemption_id/approve",
            post(approve_handler::<L>),
        )
        .route(
            "/rewards/admin/redemptions/:redemption_id/reject",
            post(reject_handler::<L>),
        )
        .route(
            "/rewards/admin/redemptions/:redemption_id/mark-paid",
            post(mark_paid_handler::<L>),
        )
        .route("/events", post(submit_event_handler::<L>))
        .route("/rewards/award-sale-reward", post(submit_event_handler::<L>))
        .route("/admin/rewards/export.csv", get(export_handler::<L>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct VoucherRequest {
    amount_cents: i64,
}

#[derive(Debug, Deserialize)]
struct MarkPaidRequest {
    provider_ref: String,
}

/// Identity is a bare `x-user-id` header for now; a missing or blank value is
/// a hard authorization failure, never retried.
fn authenticated_user(headers: &HeaderMap) -> Result<UserId, Response> {
    let value = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match value {
        Some(id) => Ok(UserId(id.to_string())),
        None => {
            let payload = json!({ "error": "missing or empty x-user-id header" });
            Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response())
        }
    }
}

fn error_response(error: RewardServiceError) -> Response {
    let status = match &error {
        RewardServiceError::Calculation(_) | RewardServiceError::NonPositiveAmount => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RewardServiceError::Transition(TransitionError::MissingProviderRef) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RewardServiceError::Transition(TransitionError::InvalidTransition { .. }) => {
            StatusCode::CONFLICT
        }
        RewardServiceError::Ledger(LedgerError::NotFound) => StatusCode::NOT_FOUND,
        RewardServiceError::Ledger(LedgerError::InsufficientBalance { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RewardServiceError::Ledger(LedgerError::Conflict) => StatusCode::CONFLICT,
        RewardServiceError::Ledger(LedgerError::Unavailable(_))
        | RewardServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

async fn profile_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
) -> Response
where
    L: RewardLedger + 'static,
{
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.profile(&user) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_voucher_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
    Json(request): Json<VoucherRequest>,
) -> Response
where
    L: RewardLedger + 'static,
{
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.create_voucher(&user, request.amount_cents) {
        Ok(voucher) => (StatusCode::CREATED, Json(voucher)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_redemption_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
    Json(request): Json<RedemptionRequest>,
) -> Response
where
    L: RewardLedger + 'static,
{
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.create_redemption(&user, request) {
        Ok(redemption) => (StatusCode::ACCEPTED, Json(redemption)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn my_redemptions_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
) -> Response
where
    L: RewardLedger + 'static,
{
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.my_redemptions(&user) {
        Ok(redemptions) => (StatusCode::OK, Json(redemptions)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn admin_summary_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
) -> Response
where
    L: RewardLedger + 'static,
{
    if let Err(response) = authenticated_user(&headers) {
        return response;
    }

    match service.admin_summary() {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn admin_redemptions_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
) -> Response
where
    L: RewardLedger + 'static,
{
    if let Err(response) = authenticated_user(&headers) {
        return response;
    }

    match service.admin_redemptions() {
        Ok(redemptions) => (StatusCode::OK, Json(redemptions)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn approve_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
    Path(redemption_id): Path<String>,
) -> Response
where
    L: RewardLedger + 'static,
{
    if let Err(response) = authenticated_user(&headers) {
        return response;
    }

    match service.approve(&RedemptionId(redemption_id)) {
        Ok(redemption) => (StatusCode::OK, Json(redemption)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn reject_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
    Path(redemption_id): Path<String>,
) -> Response
where
    L: RewardLedger + 'static,
{
    if let Err(response) = authenticated_user(&headers) {
        return response;
    }

    match service.reject(&RedemptionId(redemption_id)) {
        Ok(redemption) => (StatusCode::OK, Json(redemption)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn mark_paid_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
    Path(redemption_id): Path<String>,
    Json(request): Json<MarkPaidRequest>,
) -> Response
where
    L: RewardLedger + 'static,
{
    if let Err(response) = authenticated_user(&headers) {
        return response;
    }

    match service.mark_paid(&RedemptionId(redemption_id), &request.provider_ref) {
        Ok(redemption) => (StatusCode::OK, Json(redemption)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn submit_event_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
    Json(event): Json<RewardEvent>,
) -> Response
where
    L: RewardLedger + 'static,
{
    if let Err(response) = authenticated_user(&headers) {
        return response;
    }

    match service.ingest_event(event) {
        Ok(receipt) => (StatusCode::ACCEPTED, Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn export_handler<L>(
    State(service): State<Arc<RewardService<L>>>,
    headers: HeaderMap,
) -> Response
where
    L: RewardLedger + 'static,
{
    if let Err(response) = authenticated_user(&headers) {
        return response;
    }

    match service.export_csv() {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv")],
            csv,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}
