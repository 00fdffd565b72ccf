//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → 환경 변수 순으로 덮어씁니다.
//! 환경 변수는 `COACHGATE__` 접두사와 `__` 구분자를 사용합니다
//! (예: `COACHGATE__TOKEN__SECRET`, `COACHGATE__ROLES__INITIAL=COACH,CLIENT`).

use std::fmt;
use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roles::{RoleName, DEFAULT_ROLE_NAMES};

/// 서명 비밀 키 최소 길이 (바이트).
pub const MIN_SECRET_LEN: usize = 32;

/// 토큰 유효 기간 상한 (30일).
pub const MAX_LIFETIME_MINUTES: i64 = 30 * 24 * 60;

/// 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("설정 로드 실패: {0}")]
    Load(#[from] config::ConfigError),

    #[error("잘못된 설정: {0}")]
    Invalid(String),
}

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 토큰 설정
    pub token: TokenConfig,
    /// 비밀번호 해싱 작업량
    pub password: PasswordConfig,
    /// 시작 시 등록할 역할
    pub roles: RolesConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

/// 데이터베이스 설정.
///
/// `url`이 없으면 인메모리 저장소를 사용합니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 10,
        }
    }
}

/// 토큰 설정.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC 서명 비밀 키 (기본값 없음)
    pub secret: String,
    /// `iss` 클레임
    pub issuer: String,
    /// 토큰 유효 기간 (분)
    pub lifetime_minutes: i64,
    /// 만료 시각 허용 오차 (초)
    pub leeway_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "coachgate".to_string(),
            lifetime_minutes: 60,
            leeway_secs: 0,
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("lifetime_minutes", &self.lifetime_minutes)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl TokenConfig {
    /// 서명 비밀 키를 [`SecretString`]으로 반환.
    pub fn secret(&self) -> SecretString {
        SecretString::new(self.secret.clone().into())
    }

    /// 토큰 유효 기간 (초). 상한을 넘는 값은 상한으로 제한됩니다.
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_minutes.min(MAX_LIFETIME_MINUTES) * 60
    }
}

/// Argon2id 작업량.
///
/// 기본값은 argon2 크레이트의 권장값(19 MiB, 2회, 병렬 1)입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// 메모리 비용 (KiB)
    pub memory_kib: u32,
    /// 반복 횟수
    pub iterations: u32,
    /// 병렬도
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// 역할 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RolesConfig {
    /// 시작 시 등록할 역할 이름
    pub initial: Vec<String>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            initial: DEFAULT_ROLE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드하고 검증합니다.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder()?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()).required(false));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("COACHGATE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("roles.initial")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// 기본 경로(`config/default.toml`)에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Some("config/default.toml"))
    }

    /// TOML 문자열에서 설정을 로드합니다. 환경 변수는 읽지 않습니다.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Self::builder()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?)
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "token.secret은 최소 {MIN_SECRET_LEN}바이트 이상이어야 합니다"
            )));
        }
        if !(1..=MAX_LIFETIME_MINUTES).contains(&self.token.lifetime_minutes) {
            return Err(ConfigError::Invalid(format!(
                "token.lifetime_minutes는 1-{MAX_LIFETIME_MINUTES} 범위여야 합니다"
            )));
        }
        argon2::Params::new(
            self.password.memory_kib,
            self.password.iterations,
            self.password.parallelism,
            None,
        )
        .map_err(|e| ConfigError::Invalid(format!("password 작업량 설정 오류: {e}")))?;

        self.initial_roles()?;
        Ok(())
    }

    /// 시작 시 등록할 역할 이름을 파싱합니다.
    pub fn initial_roles(&self) -> Result<Vec<RoleName>, ConfigError> {
        if self.roles.initial.is_empty() {
            return Err(ConfigError::Invalid(
                "roles.initial에 최소 1개의 역할이 필요합니다".to_string(),
            ));
        }

        self.roles
            .initial
            .iter()
            .map(|name| {
                RoleName::parse(name)
                    .ok_or_else(|| ConfigError::Invalid(format!("잘못된 역할 이름: {name:?}")))
            })
            .collect()
    }
}
