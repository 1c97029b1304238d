use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{WorkflowError, WorkflowResult};

/// Ceiling applied by the default display policy, in percent.
pub const DEFAULT_EFFICIENCY_CEILING: Decimal = dec!(150);

/// `estimated / actual * 100`, unclamped. No time spent yet yields zero.
pub fn efficiency_percent(estimated: Decimal, actual: Decimal) -> WorkflowResult<Decimal> {
    if estimated < Decimal::ZERO || actual < Decimal::ZERO {
        return Err(WorkflowError::validation(format!(
            "hours cannot be negative (estimated {estimated}, actual {actual})"
        )));
    }
    if actual.is_zero() {
        return Ok(Decimal::ZERO);
    }
    estimated
        .checked_div(actual)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| WorkflowError::validation("efficiency ratio is out of range"))
}

/// Presentation clamp for efficiency figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPolicy {
    pub ceiling: Decimal,
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_EFFICIENCY_CEILING,
        }
    }
}

impl DisplayPolicy {
    pub fn new(ceiling: Decimal) -> WorkflowResult<Self> {
        if ceiling <= Decimal::ZERO {
            return Err(WorkflowError::validation(format!(
                "efficiency ceiling must be positive, got {ceiling}"
            )));
        }
        Ok(Self { ceiling })
    }

    pub fn clamp(&self, value: Decimal) -> Decimal {
        value.min(self.ceiling)
    }
}
