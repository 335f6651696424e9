use sqlx::postgres::PgPoolOptions;

/// Connect to Postgres. Schema is applied out-of-band with psql
/// (see migrations/001_core.sql and friends).
pub async fn connect_pg(database_url: &str) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}
