//! 자격증명 저장소 추상화.
//!
//! 계정과 역할은 외부 저장소에 보관됩니다. 인증 서비스와 접근 가드는
//! [`CredentialStore`] trait만 알고 있으며, 구현체는 다음과 같습니다:
//!
//! - [`MemoryCredentialStore`]: 테스트 및 로컬 실행용 인메모리 저장소
//! - `coachgate-api`의 `PgCredentialStore`: PostgreSQL 저장소

mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::roles::{RoleName, RoleSet};

pub use memory::MemoryCredentialStore;

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 유일성 제약 위반 (같은 사용자 이름이 이미 존재)
    #[error("중복된 사용자 이름: {0}")]
    Duplicate(String),

    /// 존재하지 않는 역할 참조
    #[error("존재하지 않는 역할: {0}")]
    UnknownRole(String),

    /// 저장소 연결 불가
    #[error("저장소 연결 실패: {0}")]
    Unavailable(String),

    /// 쿼리 실행 실패
    #[error("쿼리 실패: {0}")]
    Query(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 저장된 계정.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// 사용자 이름 (생성 후 변경 불가)
    pub username: String,
    /// PHC 형식 비밀번호 해시
    pub password_hash: String,
    /// 할당된 역할 (항상 1개 이상)
    pub roles: RoleSet,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// 비밀번호 해시를 제외한 공개용 뷰.
    pub fn view(&self) -> AccountView {
        AccountView {
            username: self.username.clone(),
            roles: self.roles.clone(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("roles", &self.roles)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// 비밀번호 해시가 없는 계정 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub username: String,
    pub roles: RoleSet,
    pub created_at: DateTime<Utc>,
}

/// 새 계정 생성 요청.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub roles: RoleSet,
}

/// 자격증명 저장소.
///
/// 모든 메서드는 여러 태스크에서 동시에 호출될 수 있습니다.
/// 사용자 이름과 역할 이름의 유일성은 구현체가 보장해야 합니다.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 역할이 없으면 생성합니다. 새로 생성했으면 `true`.
    async fn create_role(&self, name: &RoleName) -> StoreResult<bool>;

    /// 등록된 전체 역할.
    async fn list_roles(&self) -> StoreResult<RoleSet>;

    /// 사용자 이름으로 계정 조회.
    async fn find_account(&self, username: &str) -> StoreResult<Option<Account>>;

    /// 계정과 역할 할당을 원자적으로 저장합니다.
    ///
    /// 사용자 이름이 이미 있으면 [`StoreError::Duplicate`],
    /// 등록되지 않은 역할이 있으면 [`StoreError::UnknownRole`]을 반환하며
    /// 이 경우 아무것도 저장되지 않습니다.
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account>;

    /// 계정의 역할 집합을 원자적으로 교체합니다. 계정이 없으면 `None`.
    async fn replace_roles(&self, username: &str, roles: &RoleSet) -> StoreResult<Option<Account>>;

    /// 저장소 연결 상태 확인.
    async fn ping(&self) -> StoreResult<()>;
}
