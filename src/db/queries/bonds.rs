use sqlx::PgPool;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::db::models::bonds::{BondModel, NewBondModel};

const BOND_COLUMNS: &str =
    "ticker, issuer, price, net_yield, maturity_date, bond_type, fetch_timestamp, notified";

/// Most recent stored record for one ticker
pub async fn get_latest_bond_by_ticker(
    pool: &PgPool,
    ticker: &str,
) -> Result<Option<BondModel>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {BOND_COLUMNS}
        FROM bonds
        WHERE ticker = $1
        ORDER BY fetch_timestamp DESC, id DESC
        LIMIT 1
        "#
    );
    sqlx::query_as::<_, BondModel>(&sql)
    .bind(ticker)
    .fetch_optional(pool)
    .await
}

/// Every record of one snapshot
pub async fn get_bonds_at_timestamp(
    pool: &PgPool,
    fetch_timestamp: DateTime<Utc>,
) -> Result<Vec<BondModel>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {BOND_COLUMNS}
        FROM bonds
        WHERE fetch_timestamp = $1
        ORDER BY ticker ASC
        "#
    );
    sqlx::query_as::<_, BondModel>(&sql)
    .bind(fetch_timestamp)
    .fetch_all(pool)
    .await
}

pub async fn get_latest_timestamp(pool: &PgPool) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<DateTime<Utc>>>("SELECT MAX(fetch_timestamp) FROM bonds")
        .fetch_one(pool)
        .await
}

/// Most recent snapshot timestamp different from `excluded`
pub async fn get_latest_timestamp_excluding(
    pool: &PgPool,
    excluded: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(fetch_timestamp) FROM bonds WHERE fetch_timestamp <> $1",
    )
    .bind(excluded)
    .fetch_one(pool)
    .await
}

/// Insert a record, or move an identical (ticker, price, net_yield) record to the new snapshot
pub async fn upsert_bond(pool: &PgPool, bond: &NewBondModel) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO bonds (ticker, issuer, price, net_yield, maturity_date, bond_type, fetch_timestamp, notified)
        VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
        ON CONFLICT (ticker, price, net_yield)
        DO UPDATE SET fetch_timestamp = EXCLUDED.fetch_timestamp
        "#,
    )
    .bind(&bond.ticker)
    .bind(&bond.issuer)
    .bind(bond.price)
    .bind(bond.net_yield)
    .bind(bond.maturity_date)
    .bind(&bond.bond_type)
    .bind(bond.fetch_timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn mark_bond_notified(
    pool: &PgPool,
    ticker: &str,
    price: Decimal,
    net_yield: Decimal,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE bonds
        SET notified = TRUE
        WHERE ticker = $1 AND price = $2 AND net_yield = $3
        "#,
    )
    .bind(ticker)
    .bind(price)
    .bind(net_yield)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
