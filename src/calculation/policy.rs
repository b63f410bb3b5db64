use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::input::CostSheetInput;
use crate::decimal::Money;
use crate::vehicle::Vehicle;

/// price the annual insurance premium is charged on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceBasis {
    /// the financed vehicle price (flat cost when given)
    VehiclePrice,
    /// always the ex-showroom price
    ExShowroom,
}

/// what the financing subtotal is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtotalAComposition {
    /// insurance and registration are already inside the financed on-road price
    EmiOnly,
    EmiPlusInsurance,
    /// EMI, monthly insurance and registration spread over the tenure
    EmiPlusInsuranceAndRegistration,
}

/// how monthly maintenance is arrived at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceMode {
    /// distance times the vehicle's maintenance cost per distance
    AutoDerived,
    /// flat monthly amount entered on the sheet
    Flat,
}

/// financing figures a policy may fold into subtotal a
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinancingParts {
    pub emi: Money,
    pub insurance_amount_monthly: Money,
    pub registration_charges: Money,
    pub tenure_months: u32,
}

/// formula variant used by the calculation engine
///
/// chosen once when the engine is configured, never per call
pub trait CalculationPolicy {
    fn name(&self) -> &str;

    fn insurance_basis(&self, input: &CostSheetInput) -> Money;

    fn subtotal_a(&self, parts: &FinancingParts) -> Money;

    fn maintenance_cost(&self, input: &CostSheetInput, vehicle: &Vehicle) -> Money;
}

/// policy assembled from the three formula switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaPolicy {
    pub insurance_basis: InsuranceBasis,
    pub subtotal_a: SubtotalAComposition,
    pub maintenance: MaintenanceMode,
}

impl FormulaPolicy {
    /// insurance on vehicle price, subtotal a = EMI, maintenance from the vehicle
    pub fn canonical() -> Self {
        Self {
            insurance_basis: InsuranceBasis::VehiclePrice,
            subtotal_a: SubtotalAComposition::EmiOnly,
            maintenance: MaintenanceMode::AutoDerived,
        }
    }

    /// the earlier sheet layout: ex-showroom insurance, fully loaded subtotal a, flat maintenance
    pub fn legacy() -> Self {
        Self {
            insurance_basis: InsuranceBasis::ExShowroom,
            subtotal_a: SubtotalAComposition::EmiPlusInsuranceAndRegistration,
            maintenance: MaintenanceMode::Flat,
        }
    }
}

impl Default for FormulaPolicy {
    fn default() -> Self {
        Self::canonical()
    }
}

impl CalculationPolicy for FormulaPolicy {
    fn name(&self) -> &str {
        if *self == Self::canonical() {
            "canonical"
        } else if *self == Self::legacy() {
            "legacy"
        } else {
            "custom"
        }
    }

    fn insurance_basis(&self, input: &CostSheetInput) -> Money {
        match self.insurance_basis {
            InsuranceBasis::VehiclePrice => input.vehicle_price(),
            InsuranceBasis::ExShowroom => input.ex_showroom_price,
        }
    }

    fn subtotal_a(&self, parts: &FinancingParts) -> Money {
        match self.subtotal_a {
            SubtotalAComposition::EmiOnly => parts.emi,
            SubtotalAComposition::EmiPlusInsurance => parts.emi + parts.insurance_amount_monthly,
            SubtotalAComposition::EmiPlusInsuranceAndRegistration => {
                let registration_monthly = if parts.tenure_months == 0 {
                    Money::ZERO
                } else {
                    parts.registration_charges / Decimal::from(parts.tenure_months)
                };
                parts.emi + parts.insurance_amount_monthly + registration_monthly
            }
        }
    }

    fn maintenance_cost(&self, input: &CostSheetInput, vehicle: &Vehicle) -> Money {
        match self.maintenance {
            MaintenanceMode::AutoDerived => {
                vehicle.maintenance_cost_per_distance * input.usage.distance_per_month
            }
            MaintenanceMode::Flat => input.add_ons.maintenance.unwrap_or(Money::ZERO),
        }
    }
}
