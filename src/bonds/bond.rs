use std::fmt;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// One Catalyst listing at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bond {
    pub ticker: String,
    pub issuer: Option<String>,
    pub price: Decimal,
    pub net_yield: Option<Decimal>, // Zero when the calculator had no answer
    pub maturity_date: Option<NaiveDate>,
    pub bond_type: Option<String>,
    pub fetch_timestamp: DateTime<Utc>, // Shared by every bond of one harvest
    pub notified: bool,
    #[serde(skip)]
    pub succeeded: bool, // Transient, never persisted
}

impl Bond {
    /// Raw listing as it comes from the exchange feed
    pub fn raw(ticker: impl Into<String>, price: Decimal, fetch_timestamp: DateTime<Utc>) -> Self {
        Self {
            ticker: ticker.into(),
            issuer: None,
            price,
            net_yield: None,
            maturity_date: None,
            bond_type: None,
            fetch_timestamp,
            notified: false,
            succeeded: false,
        }
    }

    pub fn apply_details(&mut self, details: BondDetails) {
        self.issuer = Some(details.issuer);
        self.maturity_date = Some(details.maturity_date);
        self.bond_type = Some(details.bond_type);
    }

    /// Copies descriptive fields from an earlier record of the same ticker
    pub fn copy_details_from(&mut self, prior: &Bond) {
        self.issuer = prior.issuer.clone();
        self.maturity_date = prior.maturity_date;
        self.bond_type = prior.bond_type.clone();
    }

    pub fn has_details(&self) -> bool {
        self.issuer.is_some() && self.maturity_date.is_some() && self.bond_type.is_some()
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.ticker, self.price)?;
        if let Some(net_yield) = self.net_yield {
            write!(f, " (YTM net {}%)", net_yield)?;
        }
        if let Some(maturity) = self.maturity_date {
            write!(f, " matures {}", maturity)?;
        }
        Ok(())
    }
}

/// Descriptive data returned by the bond profile endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct BondDetails {
    pub issuer: String,
    pub maturity_date: NaiveDate,
    pub bond_type: String,
}

/// Outcome of the yield calculator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YieldQuote {
    Available(Decimal),
    /// The calculator answered but had no yield for this bond
    NotAvailable,
}

impl YieldQuote {
    /// Net yield to persist, with the zero sentinel for `NotAvailable`
    pub fn net_yield(self) -> Decimal {
        match self {
            YieldQuote::Available(value) => value,
            YieldQuote::NotAvailable => Decimal::ZERO,
        }
    }
}

/// A bond whose net yield went up since the previous snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImprovedBond {
    pub bond: Bond,
    pub prev_net_yield: Decimal,
    pub prev_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;
    use std::str::FromStr;

    #[test]
    fn trailing_zero_variants_compare_equal() {
        let a = Decimal::from_str("5.0").unwrap();
        let b = Decimal::from_str("5.00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
        assert_eq!(a.cmp(&a), std::cmp::Ordering::Equal);
    }

    #[test]
    fn decimal_sums_are_exact() {
        assert_eq!(dec!(0.10) + dec!(0.20), dec!(0.30));
        assert_eq!(dec!(0.1) + dec!(0.2), dec!(0.3));
    }

    #[test]
    fn not_available_maps_to_zero_sentinel() {
        assert_eq!(YieldQuote::NotAvailable.net_yield(), Decimal::ZERO);
        assert_eq!(YieldQuote::Available(dec!(6.25)).net_yield(), dec!(6.25));
    }

    #[test]
    fn raw_bond_starts_unenriched() {
        let bond = Bond::raw("PCR0526", dec!(101.5), Utc::now());
        assert!(!bond.has_details());
        assert!(!bond.notified);
        assert!(!bond.succeeded);
        assert_eq!(bond.net_yield, None);
    }
}
