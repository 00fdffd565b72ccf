//! 역할 기반 보호 endpoint.
//!
//! - `GET /api/coach-only`: COACH
//! - `GET /api/coach-client`: COACH 또는 CLIENT
//! - `GET /api/me`: 인증된 모든 사용자

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use coachgate_core::AccountView;

use crate::auth::{Authenticated, CoachAuth, CoachOrClientAuth};
use crate::error::{api_error, auth_rejection, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 코치 전용 인사말.
///
/// GET /api/coach-only
#[utoipa::path(
    get,
    path = "/api/coach-only",
    responses(
        (status = 200, description = "인사말", body = String),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 부족", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "protected"
)]
pub async fn coach_only(CoachAuth(subject): CoachAuth) -> String {
    format!(
        "Hello {}! This route is accessible by Coach only.",
        subject.username
    )
}

/// 코치/클라이언트 공용 인사말.
///
/// GET /api/coach-client
#[utoipa::path(
    get,
    path = "/api/coach-client",
    responses(
        (status = 200, description = "인사말", body = String),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 부족", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "protected"
)]
pub async fn coach_client(CoachOrClientAuth(subject): CoachOrClientAuth) -> String {
    format!(
        "Hello {}! This route is accessible by both Coach and Client.",
        subject.username
    )
}

/// 현재 사용자 정보.
///
/// GET /api/me
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "계정 정보 (비밀번호 해시 제외)"),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "protected"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Authenticated(subject): Authenticated,
) -> ApiResult<Json<AccountView>> {
    state
        .auth
        .load_account(&subject.username)
        .await
        .map_err(auth_rejection)?
        .map(Json)
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "인증이 필요합니다",
            )
        })
}

/// 보호 라우터 생성.
pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coach-only", get(coach_only))
        .route("/coach-client", get(coach_client))
        .route("/me", get(me))
}
