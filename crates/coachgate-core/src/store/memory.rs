//! 인메모리 자격증명 저장소.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Account, CredentialStore, NewAccount, StoreError, StoreResult};
use crate::roles::{RoleName, RoleSet};

#[derive(Default)]
struct Inner {
    roles: RoleSet,
    accounts: HashMap<String, Account>,
}

/// 프로세스 메모리에 계정과 역할을 보관하는 저장소.
///
/// 존재 확인과 삽입을 하나의 쓰기 잠금 안에서 수행하므로
/// 동시 등록에서도 사용자 이름 유일성이 유지됩니다.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 계정 수.
    pub async fn account_count(&self) -> usize {
        self.inner.read().await.accounts.len()
    }
}

fn first_unknown<'a>(known: &RoleSet, requested: &'a RoleSet) -> Option<&'a RoleName> {
    requested.iter().find(|role| !known.contains(*role))
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_role(&self, name: &RoleName) -> StoreResult<bool> {
        Ok(self.inner.write().await.roles.insert(name.clone()))
    }

    async fn list_roles(&self) -> StoreResult<RoleSet> {
        Ok(self.inner.read().await.roles.clone())
    }

    async fn find_account(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self.inner.read().await.accounts.get(username).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut inner = self.inner.write().await;

        if inner.accounts.contains_key(&account.username) {
            return Err(StoreError::Duplicate(account.username));
        }
        if let Some(role) = first_unknown(&inner.roles, &account.roles) {
            return Err(StoreError::UnknownRole(role.to_string()));
        }

        let stored = Account {
            username: account.username,
            password_hash: account.password_hash,
            roles: account.roles,
            created_at: Utc::now(),
        };
        inner
            .accounts
            .insert(stored.username.clone(), stored.clone());

        Ok(stored)
    }

    async fn replace_roles(&self, username: &str, roles: &RoleSet) -> StoreResult<Option<Account>> {
        let mut inner = self.inner.write().await;

        if let Some(role) = first_unknown(&inner.roles, roles) {
            return Err(StoreError::UnknownRole(role.to_string()));
        }

        Ok(inner.accounts.get_mut(username).map(|account| {
            account.roles = roles.clone();
            account.clone()
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
