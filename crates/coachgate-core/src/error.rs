//! 인증/인가 에러 타입.
//!
//! 호출자가 처리해야 하는 결과(중복 사용자, 잘못된 자격증명 등)와
//! 하위 계층의 예기치 않은 실패(`Internal`)를 구분합니다.
//! `Internal`의 상세 내용은 로그에만 남기고 외부로 노출하지 않습니다.

use thiserror::Error;

use crate::password::PasswordError;
use crate::store::StoreError;
use crate::token::TokenError;

/// 등록/로그인 에러.
#[derive(Debug, Error)]
pub enum AuthError {
    /// 이미 존재하는 사용자 이름
    #[error("이미 사용 중인 사용자 이름입니다: {0}")]
    UsernameTaken(String),

    /// 등록되지 않은 역할
    #[error("등록되지 않은 역할입니다: {0}")]
    UnknownRole(String),

    /// 입력 값 검증 실패
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 사용자 이름 또는 비밀번호 불일치 (어느 쪽인지 구분하지 않음)
    #[error("사용자 이름 또는 비밀번호가 올바르지 않습니다")]
    InvalidCredentials,

    /// 관리 작업 대상 계정이 없음
    #[error("계정을 찾을 수 없습니다: {0}")]
    UnknownAccount(String),

    /// 저장소 장애 등 예기치 않은 실패
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl AuthError {
    /// 기계 판독용 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::UsernameTaken(_) => "USERNAME_TAKEN",
            AuthError::UnknownRole(_) => "UNKNOWN_ROLE",
            AuthError::InvalidInput(_) => "INVALID_INPUT",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(username) => AuthError::UsernameTaken(username),
            StoreError::UnknownRole(role) => AuthError::UnknownRole(role),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("blocking task failed: {err}"))
    }
}

/// 접근 제어 에러.
#[derive(Debug, Error)]
pub enum AccessError {
    /// 토큰 없음/무효/만료, 또는 계정이 사라짐
    #[error("인증이 필요합니다")]
    Unauthenticated,

    /// 인증은 되었지만 필요한 역할이 없음
    #[error("권한이 부족합니다")]
    Forbidden,

    /// 저장소 장애 등 예기치 않은 실패
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl AccessError {
    /// 기계 판독용 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated => "UNAUTHENTICATED",
            AccessError::Forbidden => "FORBIDDEN",
            AccessError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        AccessError::Internal(err.to_string())
    }
}
