//! JWT 토큰 발급 및 검증.
//!
//! 서명 키는 시작 시 한 번 로드되어 이후 변경되지 않으므로
//! [`TokenIssuer`]는 잠금 없이 여러 태스크에서 공유됩니다.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;

/// JWT 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 사용자 이름
    pub sub: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID - 토큰 고유 식별자
    pub jti: String,
}

/// 발급된 토큰.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// 인코딩된 JWT 문자열
    pub token: String,
    /// 만료까지 남은 시간 (초)
    pub expires_in: i64,
}

/// 토큰 처리 에러.
///
/// 검증 실패 원인은 로그에만 사용되며, 호출자에게는 하나의 인증 실패로 전달됩니다.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("토큰 서명이 올바르지 않습니다")]
    BadSignature,
    #[error("토큰 발급자가 올바르지 않습니다")]
    WrongIssuer,
    #[error("잘못된 토큰 형식")]
    Malformed,
}

impl TokenError {
    /// 로그용 실패 원인.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Encoding(_) => "encoding",
            TokenError::Expired => "expired",
            TokenError::BadSignature => "bad_signature",
            TokenError::WrongIssuer => "wrong_issuer",
            TokenError::Malformed => "malformed",
        }
    }
}

/// HS256 토큰 발급기.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: SecretString, config: &TokenConfig) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_secs;
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            issuer: config.issuer.clone(),
            lifetime: Duration::seconds(config.lifetime_secs()),
        }
    }

    /// 토큰 유효 기간 (초).
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime.num_seconds()
    }

    /// 사용자 이름에 묶인 토큰 발급.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            expires_in: self.lifetime_secs(),
        })
    }

    /// 토큰 디코딩 및 검증.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
                _ => TokenError::Malformed,
            })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(TokenError::from)
    }
}
