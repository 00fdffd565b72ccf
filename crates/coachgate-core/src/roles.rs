//! 역할 기반 접근 제어 (RBAC).
//!
//! 역할 이름, 접근 모드, 시작 시 역할을 등록하는 [`RoleRegistry`]를 정의합니다.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::{CredentialStore, StoreError};

/// 코치 역할 이름.
pub const COACH: &str = "COACH";

/// 고객 역할 이름.
pub const CLIENT: &str = "CLIENT";

/// 기본으로 등록되는 역할 목록.
pub const DEFAULT_ROLE_NAMES: [&str; 2] = [COACH, CLIENT];

const MAX_ROLE_NAME_LEN: usize = 64;

/// 정규화된 역할 이름.
///
/// 앞뒤 공백을 제거하고 대문자로 변환한 값만 보관합니다.
/// 영문자, 숫자, `_`만 허용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// 문자열에서 역할 이름 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase();
        let valid = !normalized.is_empty()
            && normalized.len() <= MAX_ROLE_NAME_LEN
            && normalized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');

        valid.then_some(Self(normalized))
    }

    /// `COACH` 역할.
    pub fn coach() -> Self {
        Self(COACH.to_string())
    }

    /// `CLIENT` 역할.
    pub fn client() -> Self {
        Self(CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoleName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoleName::parse(&value).ok_or_else(|| format!("잘못된 역할 이름: {value:?}"))
    }
}

impl From<RoleName> for String {
    fn from(role: RoleName) -> Self {
        role.0
    }
}

/// 역할 집합.
pub type RoleSet = BTreeSet<RoleName>;

/// 필요 역할 검사 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// 필요 역할 중 하나 이상 보유
    Any,
    /// 필요 역할 모두 보유
    All,
}

impl AccessMode {
    /// 보유 역할이 필요 역할을 충족하는지 확인.
    ///
    /// 필요 역할이 비어 있으면 인증만으로 충분하므로 항상 `true`입니다.
    pub fn is_satisfied(self, held: &RoleSet, required: &RoleSet) -> bool {
        if required.is_empty() {
            return true;
        }

        match self {
            AccessMode::Any => required.iter().any(|role| held.contains(role)),
            AccessMode::All => required.is_subset(held),
        }
    }
}

/// 역할 등록 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// 이번 호출에서 새로 생성된 역할
    pub created: Vec<RoleName>,
    /// 이미 존재하던 역할
    pub existing: Vec<RoleName>,
}

/// 역할 레지스트리.
///
/// 역할 테이블의 유일성은 저장소가 보장하므로, 여러 프로세스가 동시에
/// [`RoleRegistry::ensure`]를 호출해도 중복이 생기지 않습니다.
#[derive(Clone)]
pub struct RoleRegistry {
    store: Arc<dyn CredentialStore>,
}

impl RoleRegistry {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// 없는 역할만 생성합니다. 여러 번 호출해도 결과는 같습니다.
    pub async fn ensure(&self, names: &[RoleName]) -> Result<SeedReport, StoreError> {
        let mut report = SeedReport::default();

        for name in names {
            if self.store.create_role(name).await? {
                info!(role = %name, "Role created");
                report.created.push(name.clone());
            } else {
                debug!(role = %name, "Role already present");
                report.existing.push(name.clone());
            }
        }

        Ok(report)
    }

    /// 요청 순서상 등록되지 않은 첫 번째 역할을 반환합니다.
    pub async fn find_unknown(&self, requested: &[RoleName]) -> Result<Option<RoleName>, StoreError> {
        let known = self.store.list_roles().await?;
        Ok(requested.iter().find(|role| !known.contains(*role)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use proptest::prelude::*;

    fn set(names: &[&str]) -> RoleSet {
        names.iter().filter_map(|n| RoleName::parse(n)).collect()
    }

    #[test]
    fn test_role_name_parse() {
        assert_eq!(RoleName::parse("coach"), Some(RoleName::coach()));
        assert_eq!(RoleName::parse("  Client "), Some(RoleName::client()));
        assert_eq!(RoleName::parse("HEAD_COACH").unwrap().as_str(), "HEAD_COACH");
        assert_eq!(RoleName::parse(""), None);
        assert_eq!(RoleName::parse("   "), None);
        assert_eq!(RoleName::parse("coach; drop"), None);
        assert_eq!(RoleName::parse(&"A".repeat(65)), None);
    }

    #[test]
    fn test_role_name_serialization() {
        let json = serde_json::to_string(&RoleName::coach()).unwrap();
        assert_eq!(json, "\"COACH\"");

        let parsed: RoleName = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(parsed, RoleName::client());

        assert!(serde_json::from_str::<RoleName>("\"\"").is_err());
    }

    #[test]
    fn test_access_mode_any() {
        let held = set(&["CLIENT"]);
        assert!(AccessMode::Any.is_satisfied(&held, &set(&["CLIENT"])));
        assert!(AccessMode::Any.is_satisfied(&held, &set(&["COACH", "CLIENT"])));
        assert!(!AccessMode::Any.is_satisfied(&held, &set(&["COACH"])));
    }

    #[test]
    fn test_access_mode_all() {
        let held = set(&["COACH", "CLIENT"]);
        assert!(AccessMode::All.is_satisfied(&held, &set(&["COACH", "CLIENT"])));
        assert!(!AccessMode::All.is_satisfied(&set(&["COACH"]), &set(&["COACH", "CLIENT"])));
    }

    #[test]
    fn test_empty_requirement_only_needs_authentication() {
        let held = set(&["CLIENT"]);
        assert!(AccessMode::Any.is_satisfied(&held, &RoleSet::new()));
        assert!(AccessMode::All.is_satisfied(&RoleSet::new(), &RoleSet::new()));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = Arc::new(MemoryCredentialStore::new());
        let registry = RoleRegistry::new(store.clone());
        let names = vec![RoleName::coach(), RoleName::client()];

        let first = registry.ensure(&names).await.unwrap();
        assert_eq!(first.created, names);
        assert!(first.existing.is_empty());

        let second = registry.ensure(&names).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.existing, names);

        assert_eq!(store.list_roles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_unknown() {
        let store = Arc::new(MemoryCredentialStore::new());
        let registry = RoleRegistry::new(store);
        registry.ensure(&[RoleName::coach()]).await.unwrap();

        assert_eq!(registry.find_unknown(&[RoleName::coach()]).await.unwrap(), None);
        assert_eq!(
            registry
                .find_unknown(&[RoleName::coach(), RoleName::client()])
                .await
                .unwrap(),
            Some(RoleName::client())
        );

        // 요청 순서상 첫 번째
        let requested: Vec<RoleName> = ["GUEST", "ADMIN"]
            .iter()
            .filter_map(|n| RoleName::parse(n))
            .collect();
        assert_eq!(
            registry.find_unknown(&requested).await.unwrap(),
            RoleName::parse("GUEST")
        );
    }

    fn role_strategy() -> impl Strategy<Value = RoleSet> {
        prop::collection::btree_set(
            prop::sample::select(vec!["COACH", "CLIENT", "ADMIN", "GUEST"]),
            0..4,
        )
        .prop_map(|names| names.into_iter().filter_map(RoleName::parse).collect())
    }

    proptest! {
        #[test]
        fn prop_all_implies_any(held in role_strategy(), required in role_strategy()) {
            if AccessMode::All.is_satisfied(&held, &required) {
                prop_assert!(AccessMode::Any.is_satisfied(&held, &required));
            }
        }

        #[test]
        fn prop_all_fails_when_one_role_missing(held in role_strategy(), required in role_strategy()) {
            let missing = required.iter().any(|r| !held.contains(r));
            prop_assert_eq!(AccessMode::All.is_satisfied(&held, &required), !missing);
        }

        #[test]
        fn prop_superset_satisfies_all(required in role_strategy()) {
            prop_assert!(AccessMode::All.is_satisfied(&required, &required));
        }
    }
}
