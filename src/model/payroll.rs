use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentKind {
    IncrementPercent,
    ReferralBonus,
    Deduction,
    Tax,
}

/// A named addition to a base amount; the sign comes from `kind`, never from `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    #[schema(example = "10", value_type = String)]
    pub value: Decimal,
}

impl Adjustment {
    pub fn new(kind: AdjustmentKind, value: Decimal) -> Self {
        Self { kind, value }
    }

    pub fn increment_percent(value: Decimal) -> Self {
        Self::new(AdjustmentKind::IncrementPercent, value)
    }

    pub fn referral_bonus(value: Decimal) -> Self {
        Self::new(AdjustmentKind::ReferralBonus, value)
    }

    pub fn deduction(value: Decimal) -> Self {
        Self::new(AdjustmentKind::Deduction, value)
    }

    pub fn tax(value: Decimal) -> Self {
        Self::new(AdjustmentKind::Tax, value)
    }
}

/// Pay period, one calendar month.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize, ToSchema,
)]
#[display(fmt = "{:04}-{:02}", year, month)]
#[serde(try_from = "RawPeriod")]
pub struct PayPeriod {
    #[schema(example = 2026)]
    year: i32,
    #[schema(example = 1)]
    month: u32,
}

#[derive(Deserialize)]
struct RawPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawPeriod> for PayPeriod {
    type Error = WorkflowError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        PayPeriod::new(raw.year, raw.month)
    }
}

impl PayPeriod {
    pub fn new(year: i32, month: u32) -> WorkflowResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(WorkflowError::validation(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreakdownLine {
    #[schema(example = "Increment")]
    pub label: String,
    #[schema(example = "100", value_type = String)]
    pub amount: Decimal,
}

/// Result of a net-pay computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NetPay {
    #[schema(example = "1400", value_type = String)]
    pub net_amount: Decimal,
    pub breakdown: Vec<BreakdownLine>,
}

/// One employee's pay inputs for one period. The net amount is derived on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PayrollLine {
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub period: PayPeriod,
    #[schema(example = "50000", value_type = String)]
    pub base_amount: Decimal,
    pub adjustments: Vec<Adjustment>,
}
