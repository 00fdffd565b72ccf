//! 회원가입/로그인 endpoint.
//!
//! - `POST /api/auth/register`
//! - `POST /api/auth/login`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use coachgate_core::AuthError;

use crate::error::{api_error, auth_rejection, ApiError, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 회원가입 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// 사용자 이름 (3-64자, 영문자/숫자/`.`/`_`/`-`)
    #[validate(length(min = 3, max = 64, message = "사용자 이름은 3-64자여야 합니다"))]
    pub username: String,
    /// 비밀번호
    #[validate(length(min = 1, message = "비밀번호가 비어 있습니다"))]
    pub password: String,
    /// 요청 역할 (예: ["CLIENT"])
    #[validate(length(min = 1, message = "최소 1개의 역할이 필요합니다"))]
    pub roles: Vec<String>,
}

/// 회원가입 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub username: String,
    pub roles: Vec<String>,
    pub message: String,
}

/// 로그인 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "사용자 이름이 비어 있습니다"))]
    pub username: String,
    #[validate(length(min = 1, message = "비밀번호가 비어 있습니다"))]
    pub password: String,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// 서명된 JWT
    pub token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    /// 만료까지 남은 시간 (초)
    pub expires_in: i64,
}

/// 검증 에러를 400 응답으로 변환.
fn validation_rejection(errors: ValidationErrors) -> ApiError {
    let fields = errors.field_errors();
    let message = fields
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: 유효하지 않은 값", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ");
    let invalid: Vec<String> = fields.keys().map(|f| f.to_string()).collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::with_details(
            "INVALID_INPUT",
            message,
            serde_json::json!({ "fields": invalid }),
        )),
    )
}

/// 본문 파싱 실패를 400 응답으로 변환. serde 메시지는 로그에만 남깁니다.
fn body_rejection(rejection: JsonRejection) -> ApiError {
    debug!(error = %rejection.body_text(), "Rejected register request body");
    api_error(
        StatusCode::BAD_REQUEST,
        "INVALID_INPUT",
        "요청 본문이 올바른 JSON 형식이 아닙니다",
    )
}

/// 회원가입.
///
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "회원가입 성공", body = RegisterResponse),
        (status = 400, description = "중복 사용자, 알 수 없는 역할, 잘못된 입력", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = body.map_err(body_rejection)?;
    request.validate().map_err(validation_rejection)?;

    let account = state
        .auth
        .register(&request.username, &request.password, &request.roles)
        .await
        .map_err(auth_rejection)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: account.username,
            roles: account.roles.iter().map(|r| r.to_string()).collect(),
            message: "User registered successfully.".to_string(),
        }),
    ))
}

/// 로그인.
///
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = LoginResponse),
        (status = 401, description = "잘못된 사용자 이름 또는 비밀번호", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    // 잘못된 본문과 빈 입력도 다른 로그인 실패와 같은 응답
    let request = match body {
        Ok(Json(request)) if request.validate().is_ok() => request,
        Ok(_) => {
            debug!("Login request with empty fields");
            return Err(auth_rejection(AuthError::InvalidCredentials));
        }
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected login request body");
            return Err(auth_rejection(AuthError::InvalidCredentials));
        }
    };

    let issued = state
        .auth
        .login(&request.username, &request.password)
        .await
        .map_err(auth_rejection)?;

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
    }))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::state::create_test_state;

    async fn app() -> Router {
        let state = Arc::new(create_test_state().await);
        Router::new().nest("/api/auth", auth_router()).with_state(state)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_register_returns_created() {
        let app = app().await;
        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "alice", "password": "p@ss1", "roles": ["CLIENT"]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: RegisterResponse = body_json(response).await;
        assert_eq!(body.username, "alice");
        assert_eq!(body.roles, vec!["CLIENT".to_string()]);
        assert_eq!(body.message, "User registered successfully.");
    }

    #[tokio::test]
    async fn test_register_validation_error() {
        let app = app().await;
        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "al", "password": "", "roles": []}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ApiErrorResponse = body_json(response).await;
        assert_eq!(body.code, "INVALID_INPUT");
        let fields = body.details.unwrap()["fields"].as_array().unwrap().len();
        assert_eq!(fields, 3);
    }

    #[tokio::test]
    async fn test_register_unknown_role() {
        let app = app().await;
        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "alice", "password": "p@ss1", "roles": ["ADMIN"]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ApiErrorResponse = body_json(response).await;
        assert_eq!(body.code, "UNKNOWN_ROLE");
    }

    #[tokio::test]
    async fn test_duplicate_register_and_login() {
        let app = app().await;
        let register = json!({"username": "alice", "password": "p@ss1", "roles": ["CLIENT"]});

        let first = app
            .clone()
            .oneshot(post_json("/api/auth/register", register.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .clone()
            .oneshot(post_json("/api/auth/register", register))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        let body: ApiErrorResponse = body_json(second).await;
        assert_eq!(body.code, "USERNAME_TAKEN");

        let login = app
            .oneshot(post_json(
                "/api/auth/login",
                json!({"username": "alice", "password": "p@ss1"}),
            ))
            .await
            .unwrap();
        assert_eq!(login.status(), StatusCode::OK);
        let body: LoginResponse = body_json(login).await;
        assert_eq!(body.token_type, "Bearer");
        assert_eq!(body.expires_in, 3600);
        assert!(!body.token.is_empty());
    }

    #[tokio::test]
    async fn test_login_failures_share_response() {
        let app = app().await;
        app.clone()
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "alice", "password": "p@ss1", "roles": ["CLIENT"]}),
            ))
            .await
            .unwrap();

        let mut messages = Vec::new();
        for body in [
            json!({"username": "alice", "password": "wrong"}),
            json!({"username": "mallory", "password": "p@ss1"}),
            json!({"username": "", "password": ""}),
        ] {
            let response = app
                .clone()
                .oneshot(post_json("/api/auth/login", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let error: ApiErrorResponse = body_json(response).await;
            assert_eq!(error.code, "INVALID_CREDENTIALS");
            messages.push(error.message);
        }

        assert!(messages.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_register_taken_username_with_unknown_role() {
        let app = app().await;
        let first = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "alice", "password": "p@ss1", "roles": ["CLIENT"]}),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "alice", "password": "p@ss1", "roles": ["ADMIN"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ApiErrorResponse = body_json(response).await;
        assert_eq!(body.code, "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn test_register_body_errors_use_error_format() {
        let app = app().await;

        let missing_roles = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "alice", "password": "p@ss1"}),
            ))
            .await
            .unwrap();
        assert_eq!(missing_roles.status(), StatusCode::BAD_REQUEST);
        let body: ApiErrorResponse = body_json(missing_roles).await;
        assert_eq!(body.code, "INVALID_INPUT");
        assert!(!body.message.contains("missing field"));

        let not_json = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(not_json).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ApiErrorResponse = body_json(response).await;
        assert_eq!(body.code, "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_login_body_errors_are_invalid_credentials() {
        let app = app().await;

        let missing_password = app
            .clone()
            .oneshot(post_json("/api/auth/login", json!({"username": "alice"})))
            .await
            .unwrap();
        assert_eq!(missing_password.status(), StatusCode::UNAUTHORIZED);
        let body: ApiErrorResponse = body_json(missing_password).await;
        assert_eq!(body.code, "INVALID_CREDENTIALS");

        let not_json = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(not_json).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: ApiErrorResponse = body_json(response).await;
        assert_eq!(body.code, "INVALID_CREDENTIALS");
    }
}
