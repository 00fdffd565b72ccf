//! Axum용 Bearer 토큰 인증 추출기.
//!
//! 각 추출기는 `Authorization: Bearer <token>` 헤더를 읽어
//! [`AccessGuard`](coachgate_core::AccessGuard)로 검증하고, 통과하면 요청 주체를 제공합니다.
//!
//! ```rust,ignore
//! async fn coach_handler(CoachAuth(subject): CoachAuth) -> impl IntoResponse {
//!     format!("Hello {}!", subject.username)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use coachgate_core::{AccessMode, RoleName, RoleSet, Subject};

use crate::error::{access_rejection, api_error, ApiError};
use crate::state::AppState;

/// Authorization 헤더에서 Bearer 토큰 추출.
///
/// 헤더가 없거나 형식이 다르면 401을 반환합니다. 스킴 이름은 대소문자를 구분하지 않습니다.
pub fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthenticated("인증 토큰이 필요합니다"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| unauthenticated("잘못된 Authorization 헤더 형식"))?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return Err(unauthenticated("잘못된 Authorization 헤더 형식"));
    }

    Ok(token)
}

fn unauthenticated(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
}

async fn authorize(
    parts: &Parts,
    state: &AppState,
    required: RoleSet,
    mode: AccessMode,
) -> Result<Subject, ApiError> {
    let token = bearer_token(parts)?;
    state
        .guard
        .authorize(token, &required, mode)
        .await
        .map_err(access_rejection)
}

/// 역할과 무관하게 인증만 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Subject);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authorize(parts, state, RoleSet::new(), AccessMode::Any)
            .await
            .map(Authenticated)
    }
}

/// COACH 역할을 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct CoachAuth(pub Subject);

impl FromRequestParts<Arc<AppState>> for CoachAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let required = RoleSet::from([RoleName::coach()]);
        authorize(parts, state, required, AccessMode::Any)
            .await
            .map(CoachAuth)
    }
}

/// COACH 또는 CLIENT 역할 중 하나를 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct CoachOrClientAuth(pub Subject);

impl FromRequestParts<Arc<AppState>> for CoachOrClientAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let required = RoleSet::from([RoleName::coach(), RoleName::client()]);
        authorize(parts, state, required, AccessMode::Any)
            .await
            .map(CoachOrClientAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/coach-only");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");

        let parts = parts_with(Some("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_bearer_token_rejections() {
        for header in [None, Some("abc.def.ghi"), Some("Basic dXNlcjpwYXNz"), Some("Bearer ")] {
            let parts = parts_with(header);
            let (status, body) = bearer_token(&parts).unwrap_err();
            assert_eq!(status, StatusCode::UNAUTHORIZED, "header: {header:?}");
            assert_eq!(body.code, "UNAUTHENTICATED");
        }
    }
}
