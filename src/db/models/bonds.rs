use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::bonds::Bond;
use crate::error::{PipelineError, Result};

#[derive(Debug, FromRow)]
pub struct BondModel {
    pub ticker: String,
    pub issuer: Option<String>,
    pub price: Decimal,
    pub net_yield: Decimal,
    pub maturity_date: Option<NaiveDate>,
    pub bond_type: Option<String>,
    pub fetch_timestamp: DateTime<Utc>,
    pub notified: bool,
}

impl From<BondModel> for Bond {
    fn from(model: BondModel) -> Self {
        Bond {
            ticker: model.ticker,
            issuer: model.issuer,
            price: model.price,
            net_yield: Some(model.net_yield),
            maturity_date: model.maturity_date,
            bond_type: model.bond_type,
            fetch_timestamp: model.fetch_timestamp,
            notified: model.notified,
            succeeded: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBondModel {
    pub ticker: String,
    pub issuer: Option<String>,
    pub price: Decimal,
    pub net_yield: Decimal,
    pub maturity_date: Option<NaiveDate>,
    pub bond_type: Option<String>,
    pub fetch_timestamp: DateTime<Utc>,
}

impl NewBondModel {
    /// Only enriched bonds can be stored; the yield is part of the unique key
    pub fn from_bond(bond: &Bond) -> Result<Self> {
        let net_yield = bond.net_yield.ok_or_else(|| {
            PipelineError::InvalidRecord(format!("{} has no net yield", bond.ticker))
        })?;

        Ok(Self {
            ticker: bond.ticker.clone(),
            issuer: bond.issuer.clone(),
            price: bond.price,
            net_yield,
            maturity_date: bond.maturity_date,
            bond_type: bond.bond_type.clone(),
            fetch_timestamp: bond.fetch_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn unenriched_bond_cannot_be_stored() {
        let bond = Bond::raw("PCR0526", dec!(101), Utc::now());
        assert!(matches!(
            NewBondModel::from_bond(&bond),
            Err(PipelineError::InvalidRecord(_))
        ));
    }

    #[test]
    fn stored_row_becomes_enriched_bond() {
        let fetched = Utc::now();
        let model = BondModel {
            ticker: "PCR0526".to_string(),
            issuer: Some("PCC Rokita".to_string()),
            price: dec!(101.50),
            net_yield: dec!(6.25),
            maturity_date: NaiveDate::from_ymd_opt(2026, 5, 20),
            bond_type: Some("CB".to_string()),
            fetch_timestamp: fetched,
            notified: true,
        };

        let bond = Bond::from(model);
        assert_eq!(bond.net_yield, Some(dec!(6.25)));
        assert_eq!(bond.fetch_timestamp, fetched);
        assert!(bond.notified);
        assert!(bond.succeeded);
        assert!(bond.has_details());
    }
}
