//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/auth/register`, `/api/auth/login` - 회원가입/로그인
//! - `/api/coach-only`, `/api/coach-client`, `/api/me` - 역할 기반 보호 라우트

pub mod auth;
pub mod health;
pub mod protected;

pub use auth::{auth_router, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use protected::protected_router;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/auth", auth_router())
        .nest("/api", protected_router())
}
