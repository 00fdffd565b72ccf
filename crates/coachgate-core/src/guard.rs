//! 토큰 기반 접근 제어.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AccessError;
use crate::roles::{AccessMode, RoleSet};
use crate::store::CredentialStore;
use crate::token::{TokenError, TokenIssuer};

/// 인증된 요청 주체.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub username: String,
    pub roles: RoleSet,
}

/// 토큰을 검증하고 역할 요구사항을 확인합니다.
///
/// 역할은 토큰이 아니라 저장소에서 매번 조회하므로, 역할 변경은
/// 이미 발급된 토큰에도 즉시 반영됩니다.
pub struct AccessGuard {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenIssuer>,
}

impl AccessGuard {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// 요청 인가.
    ///
    /// - 토큰 무효/만료, 계정 삭제: [`AccessError::Unauthenticated`]
    /// - 역할 부족: [`AccessError::Forbidden`]
    ///
    /// `required`가 비어 있으면 인증만 확인합니다.
    pub async fn authorize(
        &self,
        token: &str,
        required: &RoleSet,
        mode: AccessMode,
    ) -> Result<Subject, AccessError> {
        let claims = self.tokens.validate(token).map_err(|e| {
            match e {
                TokenError::BadSignature | TokenError::WrongIssuer => {
                    warn!(reason = e.reason(), "Rejected token")
                }
                _ => debug!(reason = e.reason(), "Rejected token"),
            }
            AccessError::Unauthenticated
        })?;

        let account = self.store.find_account(&claims.sub).await?.ok_or_else(|| {
            debug!(username = %claims.sub, "Token subject no longer exists");
            AccessError::Unauthenticated
        })?;

        if !mode.is_satisfied(&account.roles, required) {
            debug!(
                username = %account.username,
                held = ?account.roles,
                required = ?required,
                mode = ?mode,
                "Insufficient roles"
            );
            return Err(AccessError::Forbidden);
        }

        Ok(Subject {
            username: account.username,
            roles: account.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::roles::RoleName;
    use crate::store::{MemoryCredentialStore, NewAccount};
    use secrecy::SecretString;

    const TEST_SECRET: &str = "guard-test-secret-with-at-least-32-bytes";

    fn issuer(secret: &str) -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(
            SecretString::new(secret.into()),
            &TokenConfig::default(),
        ))
    }

    fn set(roles: &[RoleName]) -> RoleSet {
        roles.iter().cloned().collect()
    }

    async fn setup() -> (AccessGuard, Arc<MemoryCredentialStore>, Arc<TokenIssuer>) {
        let store = Arc::new(MemoryCredentialStore::new());
        store.create_role(&RoleName::coach()).await.unwrap();
        store.create_role(&RoleName::client()).await.unwrap();

        for (username, roles) in [
            ("alice", set(&[RoleName::client()])),
            ("carol", set(&[RoleName::coach(), RoleName::client()])),
        ] {
            store
                .insert_account(NewAccount {
                    username: username.to_string(),
                    password_hash: "$argon2id$unused".to_string(),
                    roles,
                })
                .await
                .unwrap();
        }

        let tokens = issuer(TEST_SECRET);
        let guard = AccessGuard::new(store.clone(), tokens.clone());
        (guard, store, tokens)
    }

    #[tokio::test]
    async fn test_any_mode() {
        let (guard, _, tokens) = setup().await;
        let token = tokens.issue("alice").unwrap().token;

        let both = set(&[RoleName::coach(), RoleName::client()]);
        let subject = guard.authorize(&token, &both, AccessMode::Any).await.unwrap();
        assert_eq!(subject.username, "alice");

        let coach_only = set(&[RoleName::coach()]);
        assert!(matches!(
            guard.authorize(&token, &coach_only, AccessMode::Any).await,
            Err(AccessError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_all_mode() {
        let (guard, _, tokens) = setup().await;
        let both = set(&[RoleName::coach(), RoleName::client()]);

        let alice = tokens.issue("alice").unwrap().token;
        assert!(matches!(
            guard.authorize(&alice, &both, AccessMode::All).await,
            Err(AccessError::Forbidden)
        ));

        let carol = tokens.issue("carol").unwrap().token;
        assert!(guard.authorize(&carol, &both, AccessMode::All).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_requirement_needs_only_authentication() {
        let (guard, _, tokens) = setup().await;
        let token = tokens.issue("alice").unwrap().token;

        for mode in [AccessMode::Any, AccessMode::All] {
            assert!(guard.authorize(&token, &RoleSet::new(), mode).await.is_ok());
        }
        assert!(matches!(
            guard.authorize("garbage", &RoleSet::new(), AccessMode::Any).await,
            Err(AccessError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_invalid_tokens_are_unauthenticated() {
        let (guard, _, _) = setup().await;
        let required = set(&[RoleName::client()]);

        let forged = issuer("another-secret-that-is-also-32-bytes-long")
            .issue("alice")
            .unwrap()
            .token;

        for token in [forged.as_str(), "", "not.a.token"] {
            assert!(matches!(
                guard.authorize(token, &required, AccessMode::Any).await,
                Err(AccessError::Unauthenticated)
            ));
        }
    }

    #[tokio::test]
    async fn test_deleted_subject_is_unauthenticated() {
        let (guard, _, tokens) = setup().await;
        let token = tokens.issue("ghost").unwrap().token;

        assert!(matches!(
            guard.authorize(&token, &RoleSet::new(), AccessMode::Any).await,
            Err(AccessError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_role_changes_apply_to_existing_tokens() {
        let (guard, store, tokens) = setup().await;
        let token = tokens.issue("alice").unwrap().token;
        let coach_only = set(&[RoleName::coach()]);

        assert!(guard.authorize(&token, &coach_only, AccessMode::Any).await.is_err());

        store
            .replace_roles("alice", &set(&[RoleName::coach()]))
            .await
            .unwrap();
        assert!(guard.authorize(&token, &coach_only, AccessMode::Any).await.is_ok());
    }
}
