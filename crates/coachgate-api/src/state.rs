//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다.
//! 내부 구성요소는 시작 후 변경되지 않으므로 잠금이 필요 없습니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use coachgate_core::{
    AccessGuard, AppConfig, AuthError, AuthService, CredentialStore, PasswordHasher, RoleRegistry,
    TokenIssuer,
};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 회원가입/로그인 서비스
    pub auth: Arc<AuthService>,

    /// 토큰 검증 및 역할 확인
    pub guard: Arc<AccessGuard>,

    /// 자격증명 저장소 (readiness 확인용)
    pub store: Arc<dyn CredentialStore>,

    /// 저장소 종류 ("postgres" | "memory")
    pub storage_kind: &'static str,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 설정과 저장소로 상태를 구성합니다.
    ///
    /// 역할 시드는 호출자가 [`AppState::registry`]로 별도 수행합니다.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn CredentialStore>,
        storage_kind: &'static str,
    ) -> Result<Self, AuthError> {
        let tokens = Arc::new(TokenIssuer::new(config.token.secret(), &config.token));
        let hasher = PasswordHasher::new(&config.password)?;
        let auth = AuthService::new(store.clone(), hasher, tokens.clone())?;
        let guard = AccessGuard::new(store.clone(), tokens);

        Ok(Self {
            auth: Arc::new(auth),
            guard: Arc::new(guard),
            store,
            storage_kind,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// 역할 레지스트리.
    pub fn registry(&self) -> &RoleRegistry {
        self.auth.registry()
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 저장소 연결 상태 확인.
    pub async fn is_store_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}

/// 테스트용 상태 생성.
///
/// 인메모리 저장소와 최소 해싱 작업량을 사용하며 COACH, CLIENT 역할이 등록되어 있습니다.
#[cfg(any(test, feature = "test-utils"))]
pub async fn create_test_state() -> AppState {
    use coachgate_core::MemoryCredentialStore;

    let config = AppConfig::from_toml_str(
        r#"
        [token]
        secret = "test-secret-key-for-api-testing-minimum-32-chars"

        [password]
        memory_kib = 1024
        iterations = 1
        parallelism = 1
        "#,
    )
    .expect("test config");

    let store = Arc::new(MemoryCredentialStore::new());
    let state = AppState::new(&config, store, "memory").expect("test state");

    let roles = config.initial_roles().expect("initial roles");
    state.registry().ensure(&roles).await.expect("seed roles");
    state
}
