//! EMI calculator — reducing-balance amortization at the fixed product rate.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Annual interest rate offered on every flow, in percent.
pub const ANNUAL_RATE_PERCENT: Decimal = dec!(12.25);

/// Flat processing fee shown next to the EMI. Not part of the EMI itself.
pub const PROCESSING_FEE: u64 = 799;

/// Repayment duration. Only one to three years are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tenure {
    One,
    Two,
    Three,
}

impl Tenure {
    pub const ALL: [Tenure; 3] = [Tenure::One, Tenure::Two, Tenure::Three];

    pub fn years(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    pub fn months(self) -> u32 {
        u32::from(self.years()) * 12
    }

    /// Display label, e.g. "2 years".
    pub fn label(self) -> String {
        match self {
            Self::One => "1 year".to_string(),
            other => format!("{} years", other.years()),
        }
    }
}

impl TryFrom<u8> for Tenure {
    type Error = String;

    fn try_from(years: u8) -> Result<Self, Self::Error> {
        match years {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(format!("unsupported tenure: {other} years")),
        }
    }
}

impl From<Tenure> for u8 {
    fn from(tenure: Tenure) -> Self {
        tenure.years()
    }
}

impl std::str::FromStr for Tenure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let years: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("not a tenure: {s:?}"))?;
        Self::try_from(years)
    }
}

impl std::fmt::Display for Tenure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Monthly installment for `principal` over `tenure` at [`ANNUAL_RATE_PERCENT`].
pub fn compute_emi(principal: u64, tenure: Tenure) -> u64 {
    compute_emi_at(principal, tenure, ANNUAL_RATE_PERCENT)
}

/// Monthly installment at an arbitrary annual rate, rounded to the nearest
/// unit (midpoint away from zero).
pub fn compute_emi_at(principal: u64, tenure: Tenure, annual_rate_percent: Decimal) -> u64 {
    let principal = Decimal::from(principal);
    let n = i64::from(tenure.months());
    let monthly_rate = annual_rate_percent / dec!(100) / dec!(12);

    let raw = if monthly_rate.is_zero() {
        principal / Decimal::from(n)
    } else {
        let growth = (Decimal::ONE + monthly_rate).powi(n);
        principal * monthly_rate * growth / (growth - Decimal::ONE)
    };

    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(u64::MAX)
}

/// Everything the summary message shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub amount: u64,
    pub tenure: Tenure,
    pub emi: u64,
    pub processing_fee: u64,
}

impl LoanSummary {
    pub fn new(amount: u64, tenure: Tenure) -> Self {
        Self {
            amount,
            tenure,
            emi: compute_emi(amount, tenure),
            processing_fee: PROCESSING_FEE,
        }
    }
}

/// Group digits in threes: `500000` → `"500,000"`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Amount with the rupee sign: `"₹500,000"`.
pub fn format_rupees(amount: u64) -> String {
    format!("₹{}", format_amount(amount))
}
