//! PostgreSQL 자격증명 저장소.
//!
//! 테이블 구조는 `migrations/` 참조:
//! - `roles(name)`
//! - `accounts(username, password_hash, created_at)`
//! - `account_roles(username, role)`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{error, warn};

use coachgate_core::{
    Account, CredentialStore, NewAccount, RoleName, RoleSet, StoreError, StoreResult,
};

/// 계정 조회 결과 (역할은 배열로 집계).
#[derive(Debug, FromRow)]
struct AccountRecord {
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    roles: Vec<String>,
}

impl AccountRecord {
    fn into_account(self) -> Account {
        let roles = self
            .roles
            .iter()
            .filter_map(|name| {
                let role = RoleName::parse(name);
                if role.is_none() {
                    warn!(username = %self.username, role = %name, "Ignoring malformed stored role");
                }
                role
            })
            .collect();

        Account {
            username: self.username,
            password_hash: self.password_hash,
            roles,
            created_at: self.created_at,
        }
    }
}

const SELECT_ACCOUNT: &str = r#"
    SELECT a.username,
           a.password_hash,
           a.created_at,
           COALESCE(
               array_agg(ar.role ORDER BY ar.role) FILTER (WHERE ar.role IS NOT NULL),
               '{}'
           )::text[] AS roles
    FROM accounts a
    LEFT JOIN account_roles ar ON ar.username = a.username
    WHERE a.username = $1
    GROUP BY a.username, a.password_hash, a.created_at
"#;

/// PostgreSQL 기반 [`CredentialStore`].
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn role_names(roles: &RoleSet) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

/// sqlx 에러를 저장소 에러로 변환.
fn map_db_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            error!(error = %e, "Database unavailable");
            StoreError::Unavailable(e.to_string())
        }
        other => {
            error!(error = %other, "Database query failed");
            StoreError::Query(other.to_string())
        }
    }
}

/// 요청 역할 중 `roles` 테이블에 없는 첫 번째 역할 이름.
fn first_missing<'a>(requested: &'a [String], known: &[String]) -> Option<&'a String> {
    requested.iter().find(|name| !known.contains(*name))
}

async fn ensure_roles_exist(
    tx: &mut Transaction<'_, Postgres>,
    names: &[String],
) -> StoreResult<()> {
    let known: Vec<String> = sqlx::query_scalar("SELECT name FROM roles WHERE name = ANY($1)")
        .bind(names)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_db_error)?;

    match first_missing(names, &known) {
        Some(missing) => Err(StoreError::UnknownRole(missing.clone())),
        None => Ok(()),
    }
}

/// `account_roles` 삽입 에러 변환.
///
/// 사전 확인 이후 역할이 삭제된 경우 FK 위반이 발생하며,
/// 제약 조건 메시지 대신 요청한 역할 이름을 보고합니다.
fn map_role_link_error(e: sqlx::Error, names: &[String]) -> StoreError {
    let fk_violation = e
        .as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation());
    if fk_violation {
        warn!(error = %e, "Role removed while linking account roles");
        return StoreError::UnknownRole(names.join(", "));
    }
    map_db_error(e)
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_role(&self, name: &RoleName) -> StoreResult<bool> {
        let result =
            sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(name.as_str())
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_roles(&self) -> StoreResult<RoleSet> {
        let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM roles")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(names
            .into_iter()
            .filter_map(|(name,)| RoleName::parse(&name))
            .collect())
    }

    async fn find_account(&self, username: &str) -> StoreResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(SELECT_ACCOUNT)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(record.map(AccountRecord::into_account))
    }

    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        let roles = role_names(&account.roles);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        ensure_roles_exist(&mut tx, &roles).await?;

        let (created_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO accounts (username, password_hash)
            VALUES ($1, $2)
            RETURNING created_at
            "#,
        )
        .bind(&account.username)
        .bind(&account.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return StoreError::Duplicate(account.username.clone());
                }
            }
            map_db_error(e)
        })?;

        sqlx::query(
            r#"
            INSERT INTO account_roles (username, role)
            SELECT $1, role FROM UNNEST($2::text[]) AS role
            "#,
        )
        .bind(&account.username)
        .bind(&roles)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_role_link_error(e, &roles))?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(Account {
            username: account.username,
            password_hash: account.password_hash,
            roles: account.roles,
            created_at,
        })
    }

    async fn replace_roles(&self, username: &str, roles: &RoleSet) -> StoreResult<Option<Account>> {
        let names = role_names(roles);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // 동시 교체 직렬화
        let locked: Option<(String,)> =
            sqlx::query_as("SELECT username FROM accounts WHERE username = $1 FOR UPDATE")
                .bind(username)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;
        if locked.is_none() {
            return Ok(None);
        }
        ensure_roles_exist(&mut tx, &names).await?;

        sqlx::query("DELETE FROM account_roles WHERE username = $1")
            .bind(username)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query(
            r#"
            INSERT INTO account_roles (username, role)
            SELECT $1, role FROM UNNEST($2::text[]) AS role
            "#,
        )
        .bind(username)
        .bind(&names)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_role_link_error(e, &names))?;

        let record = sqlx::query_as::<_, AccountRecord>(SELECT_ACCOUNT)
            .bind(username)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(record.map(AccountRecord::into_account))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_into_account_skips_malformed_roles() {
        let record = AccountRecord {
            username: "alice".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            created_at: Utc::now(),
            roles: vec!["CLIENT".to_string(), "bad role".to_string()],
        };

        let account = record.into_account();
        assert_eq!(account.roles.len(), 1);
        assert!(account.roles.contains(&RoleName::client()));
    }

    #[test]
    fn test_first_missing_role_in_request_order() {
        let requested = vec!["GUEST".to_string(), "CLIENT".to_string(), "ADMIN".to_string()];
        let known = vec!["CLIENT".to_string(), "COACH".to_string()];
        assert_eq!(first_missing(&requested, &known), Some(&"GUEST".to_string()));

        let all_known = vec!["CLIENT".to_string()];
        assert_eq!(first_missing(&all_known, &known), None);
    }

    #[test]
    fn test_role_link_error_without_db_error_is_query() {
        let names = vec!["CLIENT".to_string()];
        assert!(matches!(
            map_role_link_error(sqlx::Error::RowNotFound, &names),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            map_db_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }
}
