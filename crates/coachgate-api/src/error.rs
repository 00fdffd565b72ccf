//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다.
//! 내부 에러의 상세 내용은 로그에만 기록되고 응답 본문에는 포함되지 않습니다.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

use coachgate_core::{AccessError, AuthError};

/// 내부 에러 시 클라이언트에 반환하는 메시지.
pub const INTERNAL_ERROR_MESSAGE: &str = "요청을 처리하는 중 오류가 발생했습니다";

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "USERNAME_TAKEN",
///   "message": "Username is already taken.",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "USERNAME_TAKEN", "INVALID_CREDENTIALS", "FORBIDDEN")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }
}

/// API 핸들러 에러 타입.
pub type ApiError = (StatusCode, Json<ApiErrorResponse>);

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

/// 상태 코드와 에러 응답 생성.
pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (status, Json(ApiErrorResponse::new(code, message)))
}

fn internal_error(detail: &str) -> ApiError {
    error!(error = %detail, "Internal error while handling request");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_ERROR_MESSAGE,
    )
}

/// 회원가입/로그인 에러를 HTTP 응답으로 변환.
pub fn auth_rejection(err: AuthError) -> ApiError {
    match &err {
        AuthError::UsernameTaken(_) => {
            api_error(StatusCode::BAD_REQUEST, err.code(), "Username is already taken.")
        }
        AuthError::InvalidCredentials => api_error(
            StatusCode::UNAUTHORIZED,
            err.code(),
            "Invalid username or password.",
        ),
        AuthError::UnknownRole(_) | AuthError::InvalidInput(_) => {
            api_error(StatusCode::BAD_REQUEST, err.code(), err.to_string())
        }
        AuthError::UnknownAccount(_) => {
            api_error(StatusCode::NOT_FOUND, err.code(), err.to_string())
        }
        AuthError::Internal(detail) => internal_error(detail),
    }
}

/// 접근 제어 에러를 HTTP 응답으로 변환.
pub fn access_rejection(err: AccessError) -> ApiError {
    match &err {
        AccessError::Unauthenticated => {
            api_error(StatusCode::UNAUTHORIZED, err.code(), err.to_string())
        }
        AccessError::Forbidden => api_error(StatusCode::FORBIDDEN, err.code(), err.to_string()),
        AccessError::Internal(detail) => internal_error(detail),
    }
}
