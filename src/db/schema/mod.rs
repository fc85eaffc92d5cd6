use sqlx::{
    Executor,
    postgres::PgPool,
};

pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("bonds.sql")).await?;

    // Snapshot lookups go by timestamp, prior-record lookups by ticker
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_bonds_fetch_timestamp
        ON bonds(fetch_timestamp);
        "#
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_bonds_ticker_fetch_timestamp
        ON bonds(ticker, fetch_timestamp DESC);
        "#
    )
    .execute(pool)
    .await?;

    Ok(())
}
