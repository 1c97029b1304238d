use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{Adjustment, AdjustmentKind, BreakdownLine, NetPay, PayPeriod, PayrollLine};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Net pay from `base_amount` and the ordered adjustments.
///
/// Breakdown order is fixed: base, every increment (each a percentage of the
/// original base, never compounded), every referral bonus, then deductions
/// and taxes in the order given. No rounding is applied.
pub fn compute_net(base_amount: Decimal, adjustments: &[Adjustment]) -> WorkflowResult<NetPay> {
    if base_amount < Decimal::ZERO {
        return Err(WorkflowError::validation(format!(
            "base amount cannot be negative, got {base_amount}"
        )));
    }
    if let Some(bad) = adjustments.iter().find(|a| a.value < Decimal::ZERO) {
        return Err(WorkflowError::validation(format!(
            "{} adjustment cannot be negative, got {}",
            bad.kind.as_ref(),
            bad.value
        )));
    }

    let mut breakdown = Vec::with_capacity(adjustments.len() + 1);
    breakdown.push(line("Base", base_amount));

    for adjustment in adjustments
        .iter()
        .filter(|a| a.kind == AdjustmentKind::IncrementPercent)
    {
        let increment = base_amount
            .checked_mul(adjustment.value)
            .and_then(|v| v.checked_div(HUNDRED))
            .ok_or_else(out_of_range)?;
        breakdown.push(line("Increment", increment));
    }
    breakdown.extend(
        adjustments
            .iter()
            .filter(|a| a.kind == AdjustmentKind::ReferralBonus)
            .map(|a| line("Referral Bonus", a.value)),
    );
    breakdown.extend(adjustments.iter().filter_map(|a| match a.kind {
        AdjustmentKind::Deduction => Some(line("Deduction", -a.value)),
        AdjustmentKind::Tax => Some(line("Tax", -a.value)),
        _ => None,
    }));

    let net_amount = checked_sum(breakdown.iter().map(|l| l.amount))?;
    debug!(%base_amount, %net_amount, lines = breakdown.len(), "Net pay computed");

    Ok(NetPay {
        net_amount,
        breakdown,
    })
}

fn out_of_range() -> WorkflowError {
    WorkflowError::validation("amount out of range")
}

fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> WorkflowResult<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(out_of_range)
}

fn line(label: &str, amount: Decimal) -> BreakdownLine {
    BreakdownLine {
        label: label.to_string(),
        amount,
    }
}

impl PayrollLine {
    pub fn new(
        employee_id: u64,
        period: PayPeriod,
        base_amount: Decimal,
        adjustments: Vec<Adjustment>,
    ) -> WorkflowResult<Self> {
        let line = Self {
            employee_id,
            period,
            base_amount,
            adjustments,
        };
        line.net()?;
        Ok(line)
    }

    /// Recomputed on every call; the net amount is never cached.
    pub fn net(&self) -> WorkflowResult<NetPay> {
        compute_net(self.base_amount, &self.adjustments)
    }
}

/// A payroll line together with its derived pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Payslip {
    pub line: PayrollLine,
    pub pay: NetPay,
}

impl Payslip {
    pub fn for_line(line: PayrollLine) -> WorkflowResult<Self> {
        let pay = line.net()?;
        Ok(Self { line, pay })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PeriodAnalytics {
    pub period: PayPeriod,
    #[schema(example = 12)]
    pub headcount: usize,
    /// monthly outflow
    #[schema(example = "540000", value_type = String)]
    pub total_net: Decimal,
    #[schema(example = "45000", value_type = String)]
    pub average_net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PayrollRun {
    pub payslips: Vec<Payslip>,
    pub analytics: PeriodAnalytics,
}

/// Computes every payslip of one period and its outflow figures.
/// Fails without partial output if any line is invalid or belongs to another period.
pub fn run_payroll(period: PayPeriod, lines: Vec<PayrollLine>) -> WorkflowResult<PayrollRun> {
    let mut payslips = Vec::with_capacity(lines.len());
    for line in lines {
        if line.period != period {
            return Err(WorkflowError::validation(format!(
                "payroll line for employee {} is for {}, not {period}",
                line.employee_id, line.period
            )));
        }
        payslips.push(Payslip::for_line(line)?);
    }

    let headcount = payslips.len();
    let total_net = checked_sum(payslips.iter().map(|p| p.pay.net_amount))?;
    let average_net = if headcount == 0 {
        Decimal::ZERO
    } else {
        total_net
            .checked_div(Decimal::from(headcount))
            .ok_or_else(out_of_range)?
    };

    info!(%period, headcount, %total_net, "Payroll run computed");
    Ok(PayrollRun {
        payslips,
        analytics: PeriodAnalytics {
            period,
            headcount,
            total_net,
            average_net,
        },
    })
}
