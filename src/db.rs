use deadpool_postgres::tokio_postgres::{Config as PgConfig, NoTls};
use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolError, RecyclingMethod};
use tracing::info;

/// Embedded schema migrations, applied in order and tracked by version.
static MIGRATIONS: &[(&str, &str)] = &[("0001_init", include_str!("../migrations/0001_init.sql"))];

pub async fn init_pool(database_url: &str) -> Result<Pool, PoolError> {
    let pg_config: PgConfig = database_url
        .parse()
        .map_err(PoolError::Backend)?;

    let max_size = std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(16usize);

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
    let pool = Pool::builder(mgr)
        .max_size(max_size)
        .build()
        .expect("pool builder with no runtime config cannot fail");

    // Verify connectivity before the server starts taking traffic
    let client = pool.get().await?;
    client
        .simple_query("SELECT 1")
        .await
        .map_err(PoolError::Backend)?;
    info!(max_size, "database pool created and verified");

    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<(), crate::error::AppError> {
    let client = pool.get().await?;

    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .await?;

    for (version, sql) in MIGRATIONS {
        let applied = client
            .query_opt(
                "SELECT 1 FROM schema_migrations WHERE version = $1",
                &[version],
            )
            .await?;
        if applied.is_some() {
            continue;
        }

        client.batch_execute(sql).await?;
        client
            .execute(
                "INSERT INTO schema_migrations (version) VALUES ($1)",
                &[version],
            )
            .await?;
        info!(version = %version, "applied migration");
    }

    Ok(())
}
