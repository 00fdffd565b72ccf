//! # Coachgate Core
//!
//! 코치/클라이언트 서비스의 인증 및 역할 기반 접근 제어 핵심 로직입니다.
//!
//! 이 크레이트는 HTTP 프레임워크와 독립적으로 다음을 제공합니다:
//! - Argon2id 비밀번호 해싱
//! - HS256 JWT 발급 및 검증
//! - 역할 레지스트리와 시드
//! - 회원가입/로그인 서비스
//! - 토큰 기반 접근 가드
//! - 설정 관리 및 로깅 인프라

pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod password;
pub mod roles;
pub mod service;
pub mod store;
pub mod token;

pub use config::{AppConfig, ConfigError};
pub use error::{AccessError, AuthError};
pub use guard::{AccessGuard, Subject};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use password::{PasswordError, PasswordHasher};
pub use roles::{AccessMode, RoleName, RoleRegistry, RoleSet, SeedReport};
pub use service::AuthService;
pub use store::{
    Account, AccountView, CredentialStore, MemoryCredentialStore, NewAccount, StoreError,
    StoreResult,
};
pub use token::{Claims, IssuedToken, TokenError, TokenIssuer};
