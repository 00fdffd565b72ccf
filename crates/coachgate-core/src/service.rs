//! 인증 서비스.
//!
//! 회원가입과 로그인을 조율합니다. Argon2 연산은 CPU를 많이 쓰므로
//! `tokio::task::spawn_blocking`으로 별도 blocking thread pool에서 실행합니다.

use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, error, info, instrument, warn};

use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::roles::{RoleName, RoleRegistry, RoleSet};
use crate::store::{Account, AccountView, CredentialStore, NewAccount};
use crate::token::{IssuedToken, TokenIssuer};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 64;
const PASSWORD_MAX_LEN: usize = 1024;

/// 회원가입/로그인 서비스.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    registry: RoleRegistry,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
    /// 존재하지 않는 사용자 로그인 시 검증에 사용하는 해시.
    /// 계정 유무와 관계없이 같은 작업량의 검증을 한 번 수행하게 합니다.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenIssuer>,
    ) -> Result<Self, AuthError> {
        let dummy_password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let dummy_hash = hasher.hash(&dummy_password)?;

        Ok(Self {
            registry: RoleRegistry::new(store.clone()),
            store,
            hasher,
            tokens,
            dummy_hash,
        })
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// 회원가입.
    ///
    /// 실패 시 계정은 생성되지 않습니다. 사용자 이름 중복은 사전 조회로 한 번 걸러내지만,
    /// 동시 가입 경쟁에서는 저장소의 유일성 제약이 최종 판단을 내립니다.
    #[instrument(skip(self, password, roles))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        roles: &[String],
    ) -> Result<Account, AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        if self.store.find_account(username).await?.is_some() {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let roles = parse_roles(roles)?;

        if let Some(unknown) = self.registry.find_unknown(&roles).await? {
            debug!(role = %unknown, "Registration requested unknown role");
            return Err(AuthError::UnknownRole(unknown.to_string()));
        }
        let roles: RoleSet = roles.into_iter().collect();

        let password_hash = self.hash_blocking(password).await?;

        let account = self
            .store
            .insert_account(NewAccount {
                username: username.to_string(),
                password_hash,
                roles,
            })
            .await
            .map_err(|e| log_internal(AuthError::from(e)))?;

        info!(roles = ?account.roles, "Account registered");
        Ok(account)
    }

    /// 로그인.
    ///
    /// 존재하지 않는 사용자와 비밀번호 불일치는 같은 에러를 반환하며,
    /// 두 경우 모두 Argon2 검증을 한 번 수행합니다.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let account = self
            .store
            .find_account(username)
            .await
            .map_err(|e| log_internal(AuthError::from(e)))?;

        let (hash, exists) = match &account {
            Some(account) => (account.password_hash.clone(), true),
            None => (self.dummy_hash.clone(), false),
        };

        let matched = self.verify_blocking(password, hash).await?;
        if !(exists && matched) {
            debug!(exists, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.tokens.issue(username)?;
        info!(expires_in = issued.expires_in, "Login succeeded");
        Ok(issued)
    }

    /// 비밀번호 해시를 제외한 계정 정보 조회.
    pub async fn load_account(&self, username: &str) -> Result<Option<AccountView>, AuthError> {
        Ok(self
            .store
            .find_account(username)
            .await?
            .map(|account| account.view()))
    }

    /// 관리자용 역할 교체.
    ///
    /// 역할 집합은 비어 있을 수 없습니다.
    #[instrument(skip(self, roles))]
    pub async fn assign_roles(&self, username: &str, roles: &[String]) -> Result<Account, AuthError> {
        let roles = parse_roles(roles)?;

        if let Some(unknown) = self.registry.find_unknown(&roles).await? {
            return Err(AuthError::UnknownRole(unknown.to_string()));
        }
        let roles: RoleSet = roles.into_iter().collect();

        let account = self
            .store
            .replace_roles(username, &roles)
            .await?
            .ok_or_else(|| AuthError::UnknownAccount(username.to_string()))?;

        info!(roles = ?account.roles, "Account roles replaced");
        Ok(account)
    }

    async fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
        Ok(hash)
    }

    async fn verify_blocking(&self, password: &str, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await?
            .map_err(|e| {
                error!(error = %e, "Stored password hash could not be verified");
                AuthError::from(e)
            })
    }
}

fn log_internal(err: AuthError) -> AuthError {
    if let AuthError::Internal(detail) = &err {
        error!(error = %detail, "Credential store failure");
    }
    err
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::InvalidInput(format!(
            "사용자 이름은 {USERNAME_MIN_LEN}~{USERNAME_MAX_LEN}자여야 합니다"
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        warn!("Username contains unsupported characters");
        return Err(AuthError::InvalidInput(
            "사용자 이름에는 영문자, 숫자, '.', '_', '-'만 사용할 수 있습니다".to_string(),
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::InvalidInput("비밀번호가 비어 있습니다".to_string()));
    }
    if password.len() > PASSWORD_MAX_LEN {
        return Err(AuthError::InvalidInput(format!(
            "비밀번호는 최대 {PASSWORD_MAX_LEN}바이트입니다"
        )));
    }
    Ok(())
}

/// 역할 이름 목록을 요청 순서대로 정규화합니다.
///
/// 형식이 잘못된 이름은 등록될 수 없으므로 `UnknownRole`로 처리합니다.
fn parse_roles(names: &[String]) -> Result<Vec<RoleName>, AuthError> {
    if names.is_empty() {
        return Err(AuthError::InvalidInput(
            "최소 1개의 역할이 필요합니다".to_string(),
        ));
    }

    names
        .iter()
        .map(|name| RoleName::parse(name).ok_or_else(|| AuthError::UnknownRole(name.clone())))
        .collect()
}
