//! Credit products: loans, installments, deposits and insurance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Income reported when the applicant leaves it blank.
const DEFAULT_INCOME: f64 = 100_000.0;

/// Default loan/deposit term in months.
pub const DEFAULT_TERM_MONTHS: u32 = 12;

/// Annual deposit yield.
const DEPOSIT_RATE: f64 = 0.16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditProduct {
    Cash,
    Installment,
    #[serde(rename = "bellyred")]
    BellyRed,
    Mortgage,
    Auto,
    Deposit,
    Insurance,
}

impl CreditProduct {
    pub const ALL: [CreditProduct; 7] = [
        CreditProduct::Cash,
        CreditProduct::Installment,
        CreditProduct::BellyRed,
        CreditProduct::Mortgage,
        CreditProduct::Auto,
        CreditProduct::Deposit,
        CreditProduct::Insurance,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            CreditProduct::Cash => "cash",
            CreditProduct::Installment => "installment",
            CreditProduct::BellyRed => "bellyred",
            CreditProduct::Mortgage => "mortgage",
            CreditProduct::Auto => "auto",
            CreditProduct::Deposit => "deposit",
            CreditProduct::Insurance => "insurance",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CreditProduct::Cash => "Cash loan",
            CreditProduct::Installment => "0% installment",
            CreditProduct::BellyRed => "Belly Red",
            CreditProduct::Mortgage => "Mortgage",
            CreditProduct::Auto => "Car loan",
            CreditProduct::Deposit => "Deposit",
            CreditProduct::Insurance => "Insurance",
        }
    }

    /// Annual interest rate; `None` where a rate does not apply.
    pub fn annual_rate(&self) -> Option<f64> {
        match self {
            CreditProduct::Cash => Some(0.15),
            CreditProduct::Installment | CreditProduct::BellyRed => Some(0.0),
            CreditProduct::Mortgage => Some(0.035),
            CreditProduct::Auto => Some(0.07),
            CreditProduct::Deposit => Some(DEPOSIT_RATE),
            CreditProduct::Insurance => None,
        }
    }

    /// Endpoint applications for this product are posted to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            CreditProduct::Deposit => "/deposits/create",
            CreditProduct::Insurance => "/insurance/apply",
            _ => "/loans/apply",
        }
    }

    /// Value of the `type` field the server expects.
    fn request_type(&self) -> &'static str {
        match self {
            CreditProduct::BellyRed => "red",
            other => other.id(),
        }
    }

    /// Estimated monthly figure: the annuity payment for loans, an even
    /// split for zero-rate products, and the monthly income for deposits.
    pub fn monthly_payment(&self, principal: f64, months: u32) -> Option<f64> {
        if months == 0 || !principal.is_finite() || principal <= 0.0 {
            return None;
        }
        let annual = self.annual_rate()?;
        if *self == CreditProduct::Deposit {
            return Some(principal * annual / 12.0);
        }

        let n = f64::from(months);
        let r = annual / 12.0;
        if r == 0.0 {
            return Some(principal / n);
        }
        let growth = (1.0 + r).powf(n);
        Some(principal * (r * growth) / (growth - 1.0))
    }
}

impl fmt::Display for CreditProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CreditProduct {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CreditProduct::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| format!("unknown product: {}", s))
    }
}

/// An application for one credit product.
#[derive(Debug, Clone)]
pub struct ProductApplication {
    pub product: CreditProduct,
    pub amount: f64,
    pub term_months: u32,
    pub income: Option<f64>,
    /// Mortgage only.
    pub property_value: Option<f64>,
    /// Car loan only.
    pub vehicle_price: Option<f64>,
    /// Insurance only, e.g. `life`.
    pub insurance_type: Option<String>,
}

impl ProductApplication {
    pub fn new(product: CreditProduct, amount: f64) -> Self {
        Self {
            product,
            amount,
            term_months: DEFAULT_TERM_MONTHS,
            income: None,
            property_value: None,
            vehicle_price: None,
            insurance_type: None,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.product.endpoint()
    }

    /// JSON body: the common loan fields plus whatever the product needs.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("amount".into(), json!(self.amount));
        body.insert("term_months".into(), json!(self.term_months));
        body.insert(
            "income".into(),
            json!(self.income.filter(|i| *i > 0.0).unwrap_or(DEFAULT_INCOME)),
        );
        body.insert("type".into(), json!(self.product.request_type()));

        match self.product {
            CreditProduct::Mortgage => {
                body.insert("property_value".into(), json!(self.property_value));
            }
            CreditProduct::Auto => {
                body.insert("vehicle_price".into(), json!(self.vehicle_price));
            }
            CreditProduct::Insurance => {
                let kind = self.insurance_type.as_deref().unwrap_or("life");
                body.insert("insurance_type".into(), json!(kind));
            }
            _ => {}
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_annuity_payment() {
        // 1 000 000 at 15% over 12 months
        let payment = CreditProduct::Cash.monthly_payment(1_000_000.0, 12).expect("payment");
        assert!(close(payment, 90_258.31), "got {}", payment);
    }

    #[test]
    fn test_zero_rate_splits_evenly() {
        assert_eq!(CreditProduct::Installment.monthly_payment(240_000.0, 24), Some(10_000.0));
        assert_eq!(CreditProduct::BellyRed.monthly_payment(120_000.0, 12), Some(10_000.0));
    }

    #[test]
    fn test_deposit_income_and_unpriced_products() {
        let income = CreditProduct::Deposit.monthly_payment(1_200_000.0, 12).expect("income");
        assert!(close(income, 16_000.0));
        assert_eq!(CreditProduct::Insurance.monthly_payment(5000.0, 12), None);
        assert_eq!(CreditProduct::Cash.monthly_payment(1000.0, 0), None);
    }

    #[test]
    fn test_application_bodies() {
        let mut mortgage = ProductApplication::new(CreditProduct::Mortgage, 20_000_000.0);
        mortgage.term_months = 240;
        mortgage.property_value = Some(25_000_000.0);
        assert_eq!(mortgage.endpoint(), "/loans/apply");
        assert_eq!(
            mortgage.body(),
            json!({
                "amount": 20_000_000.0,
                "term_months": 240,
                "income": 100_000.0,
                "type": "mortgage",
                "property_value": 25_000_000.0
            })
        );

        let red = ProductApplication::new(CreditProduct::BellyRed, 50_000.0);
        assert_eq!(red.body()["type"], "red");

        let insurance = ProductApplication::new(CreditProduct::Insurance, 5000.0);
        assert_eq!(insurance.endpoint(), "/insurance/apply");
        assert_eq!(insurance.body()["insurance_type"], "life");

        assert_eq!(CreditProduct::Deposit.endpoint(), "/deposits/create");
    }

    #[test]
    fn test_product_parsing() {
        assert_eq!("bellyred".parse::<CreditProduct>(), Ok(CreditProduct::BellyRed));
        assert_eq!("AUTO".parse::<CreditProduct>(), Ok(CreditProduct::Auto));
        assert!("crypto".parse::<CreditProduct>().is_err());
    }
}
