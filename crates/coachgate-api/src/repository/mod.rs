//! Repository pattern for database operations.
//!
//! PostgreSQL 연결 풀 생성, 마이그레이션, 자격증명 저장소 구현을 제공합니다.

pub mod accounts;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use coachgate_core::config::DatabaseConfig;

pub use accounts::PgCredentialStore;

/// 설정된 URL로 연결 풀을 생성합니다.
pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "Database connection established"
    );
    Ok(pool)
}

/// 데이터베이스 마이그레이션을 실행합니다.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations...");
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Migrations completed successfully");
    Ok(())
}
