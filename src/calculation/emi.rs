use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{CostSheetError, Result};

/// one month of the financing breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub month: u32,
    pub opening_balance: Money,
    pub installment: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub closing_balance: Money,
}

/// reducing-balance repayment schedule behind an EMI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingSchedule {
    pub principal: Money,
    pub annual_rate: Rate,
    pub tenure_months: u32,
    pub emi: Money,
    pub installments: Vec<ScheduledInstallment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl FinancingSchedule {
    /// generate the month-by-month breakdown
    pub fn generate(principal: Money, annual_rate: Rate, tenure_months: u32) -> Result<Self> {
        let emi = calculate_emi(principal, annual_rate, tenure_months)?;
        let monthly_rate = annual_rate.monthly_rate().as_decimal().max(Decimal::ZERO);

        let mut installments = Vec::with_capacity(tenure_months as usize);
        let mut balance = principal;

        for month in 1..=tenure_months {
            let interest_portion = balance * monthly_rate;
            let principal_portion = emi - interest_portion;
            let closing_balance = (balance - principal_portion).max(Money::ZERO);

            installments.push(ScheduledInstallment {
                month,
                opening_balance: balance,
                installment: emi,
                principal_portion,
                interest_portion,
                closing_balance,
            });

            balance = closing_balance;
        }

        // absorb rounding residue into the last installment
        if let Some(last) = installments.last_mut() {
            if last.closing_balance.is_positive() && last.closing_balance < Money::ONE {
                last.principal_portion += last.closing_balance;
                last.installment += last.closing_balance;
                last.closing_balance = Money::ZERO;
            }
        }

        let total_interest = installments.iter().map(|i| i.interest_portion).sum();
        let total_payment = installments.iter().map(|i| i.installment).sum();

        Ok(Self {
            principal,
            annual_rate,
            tenure_months,
            emi,
            installments,
            total_interest,
            total_payment,
        })
    }

    pub fn installment(&self, month: u32) -> Option<&ScheduledInstallment> {
        month
            .checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    /// outstanding principal after the given month
    pub fn balance_after(&self, month: u32) -> Money {
        self.installment(month)
            .map(|i| i.closing_balance)
            .unwrap_or(self.principal)
    }
}

/// equated monthly installment by the reducing-balance annuity formula
///
/// a non-positive monthly rate falls back to straight-line repayment; zero months is refused
pub fn calculate_emi(principal: Money, annual_rate: Rate, months: u32) -> Result<Money> {
    if months == 0 {
        return Err(CostSheetError::CalculationError {
            message: "tenure must be at least one month".to_string(),
        });
    }

    let r = annual_rate.monthly_rate().as_decimal();

    if r <= Decimal::ZERO {
        return Ok(principal / Decimal::from(months));
    }

    // EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)
    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + r;
    for _ in 0..months {
        compound *= base;
    }

    let numerator = principal.as_decimal() * r * compound;
    let denominator = compound - Decimal::ONE;

    Ok(Money::from_decimal(numerator / denominator))
}
