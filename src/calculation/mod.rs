pub mod emi;
pub mod input;
pub mod policy;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost_sheet::Revision;
use crate::decimal::Money;
use crate::errors::{CostSheetError, Result};
use crate::rates::ResolvedRates;
use crate::vehicle::Vehicle;

pub use emi::{calculate_emi, FinancingSchedule, ScheduledInstallment};
pub use input::{CostSheetInput, DriverCost, MonthlyAddOns, Usage};
pub use policy::{
    CalculationPolicy, FinancingParts, FormulaPolicy, InsuranceBasis, MaintenanceMode,
    SubtotalAComposition,
};

/// every monetary figure derived from a cost sheet's inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub tenure_months: u32,
    pub vehicle_price: Money,
    pub insurance_amount_annual: Money,
    pub insurance_amount_monthly: Money,
    pub on_road_price: Money,
    pub down_payment_amount: Money,
    pub loan_amount: Money,
    pub emi: Money,
    pub subtotal_a: Money,
    pub fuel_cost: Money,
    pub maintenance_cost: Money,
    pub total_driver_cost: Money,
    pub subtotal_b: Money,
    pub admin_charge_amount: Money,
    pub grand_total: Money,
}

impl DerivedFields {
    /// grand total rebuilt from the stored subtotals
    pub fn recomputed_grand_total(&self) -> Money {
        self.subtotal_a + self.subtotal_b + self.admin_charge_amount
    }

    pub fn is_consistent(&self) -> bool {
        self.recomputed_grand_total() == self.grand_total
    }
}

/// pure mapping from validated input, resolved rates and vehicle to derived fields
#[derive(Debug, Clone, Default)]
pub struct CalculationEngine<P = FormulaPolicy> {
    policy: P,
}

impl<P: CalculationPolicy> CalculationEngine<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// derive every monetary field
    ///
    /// input is expected to have passed `CostSheetInput::validate`; only inputs that would
    /// divide by zero are refused here
    pub fn calculate(
        &self,
        input: &CostSheetInput,
        rates: &ResolvedRates,
        vehicle: &Vehicle,
    ) -> Result<DerivedFields> {
        let tenure_months = input.tenure_months();
        let vehicle_price = input.vehicle_price();

        // insurance
        let insurance_amount_annual = self
            .policy
            .insurance_basis(input)
            .percentage(rates.insurance.as_percentage());
        let insurance_amount_monthly = insurance_amount_annual / Decimal::from(12);

        // financing
        let on_road_price = vehicle_price + insurance_amount_annual + input.registration_charges;
        let down_payment_amount = on_road_price.apply_rate(input.down_payment_rate());
        let loan_amount = on_road_price - down_payment_amount;
        let emi = calculate_emi(loan_amount, rates.interest, tenure_months)?;

        let subtotal_a = self.policy.subtotal_a(&FinancingParts {
            emi,
            insurance_amount_monthly,
            registration_charges: input.registration_charges,
            tenure_months,
        });

        // operations
        if vehicle.mileage_per_unit.is_zero() {
            return Err(CostSheetError::CalculationError {
                message: format!("vehicle {} has zero mileage", vehicle.id),
            });
        }
        let fuel_price = rates.fuel_rate_for(vehicle.fuel_type);
        let fuel_cost = Money::from_decimal(
            input.usage.distance_per_month * fuel_price.as_decimal() / vehicle.mileage_per_unit,
        );
        let maintenance_cost = self.policy.maintenance_cost(input, vehicle);
        let driver_count = Decimal::from(input.drivers.count);
        let total_driver_cost = input.drivers.salary_per_driver * driver_count;

        let subtotal_b = fuel_cost
            + total_driver_cost
            + maintenance_cost
            + input.add_ons.parking
            + input.add_ons.supervisor
            + input.add_ons.gps
            + input.add_ons.permit;

        let admin_charge_amount = (subtotal_a + subtotal_b).apply_rate(rates.admin_charge);
        let grand_total = subtotal_a + subtotal_b + admin_charge_amount;

        debug!(
            policy = self.policy.name(),
            loan_amount = %loan_amount,
            emi = %emi,
            subtotal_a = %subtotal_a,
            subtotal_b = %subtotal_b,
            grand_total = %grand_total,
            "cost sheet calculated"
        );

        Ok(DerivedFields {
            tenure_months,
            vehicle_price,
            insurance_amount_annual,
            insurance_amount_monthly,
            on_road_price,
            down_payment_amount,
            loan_amount,
            emi,
            subtotal_a,
            fuel_cost,
            maintenance_cost,
            total_driver_cost,
            subtotal_b,
            admin_charge_amount,
            grand_total,
        })
    }

    /// calculate and freeze the result together with the input and rates it came from
    pub fn price(
        &self,
        input: CostSheetInput,
        rates: ResolvedRates,
        vehicle: &Vehicle,
        priced_at: DateTime<Utc>,
    ) -> Result<Revision> {
        if input.vehicle_id != vehicle.id {
            return Err(CostSheetError::validation(
                "vehicle_id",
                format!("input references {}, priced against {}", input.vehicle_id, vehicle.id),
            ));
        }
        let derived = self.calculate(&input, &rates, vehicle)?;
        Ok(Revision::new(input, derived, rates, priced_at))
    }

    /// month-by-month breakdown of the financed amount
    pub fn financing_schedule(
        &self,
        derived: &DerivedFields,
        rates: &ResolvedRates,
    ) -> Result<FinancingSchedule> {
        FinancingSchedule::generate(derived.loan_amount, rates.interest, derived.tenure_months)
    }
}
