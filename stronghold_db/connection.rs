use sqlx::postgres::{PgPool, PgPoolOptions};
use std::env;

use stronghold_types::errors::DbError;

pub type DbPool = PgPool;

pub async fn establish_connection_pool() -> Result<DbPool, DbError> {
    init_connection_pool("DATABASE_URL").await
}

pub async fn establish_test_connection_pool() -> Result<DbPool, DbError> {
    init_connection_pool("TEST_DATABASE_URL").await
}

async fn init_connection_pool(database_env: &'static str) -> Result<DbPool, DbError> {
    dotenvy::dotenv().ok();

    let database_url = env::var(database_env)
        .map_err(|_| DbError::Transaction(format!("{database_env} must be set")))?;
    let max_connections = env::var("STRONGHOLD_DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(5);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await?;
    tracing::info!(max_connections, "Database pool ready");
    Ok(pool)
}
