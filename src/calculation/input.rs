use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{CostSheetError, Result};
use crate::types::VehicleId;
use crate::vehicle::Vehicle;

pub const MIN_TENURE_YEARS: u32 = 1;
pub const MAX_TENURE_YEARS: u32 = 10;
pub const MAX_DAILY_HOURS: u32 = 24;

/// vehicle usage per month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Usage {
    pub distance_per_month: Decimal,
    pub daily_hours: Decimal,
}

/// chauffeur cost per month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DriverCost {
    pub count: u32,
    pub salary_per_driver: Money,
}

/// flat monthly add-on costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MonthlyAddOns {
    pub parking: Money,
    pub supervisor: Money,
    pub gps: Money,
    pub permit: Money,
    /// only used when maintenance is not derived from the vehicle
    pub maintenance: Option<Money>,
}

impl MonthlyAddOns {
    /// parking + supervisor + gps + permit
    pub fn fixed_total(&self) -> Money {
        self.parking + self.supervisor + self.gps + self.permit
    }
}

/// raw cost sheet inputs as entered by staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSheetInput {
    pub company_name: String,
    pub vehicle_id: VehicleId,
    /// city used for fuel price lookup
    pub city: Option<String>,
    pub tenure_years: u32,
    pub ex_showroom_price: Money,
    /// negotiated flat vehicle price, replaces ex-showroom as the financed price
    pub vehicle_cost: Option<Money>,
    /// none means full financing
    pub down_payment_percent: Option<Decimal>,
    pub registration_charges: Money,
    pub usage: Usage,
    pub drivers: DriverCost,
    pub add_ons: MonthlyAddOns,
}

impl CostSheetInput {
    /// minimal input for a vehicle; remaining fields default to zero
    pub fn new(
        company_name: impl Into<String>,
        vehicle_id: VehicleId,
        tenure_years: u32,
        ex_showroom_price: Money,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            vehicle_id,
            city: None,
            tenure_years,
            ex_showroom_price,
            vehicle_cost: None,
            down_payment_percent: None,
            registration_charges: Money::ZERO,
            usage: Usage::default(),
            drivers: DriverCost::default(),
            add_ons: MonthlyAddOns::default(),
        }
    }

    /// price the vehicle is financed at
    pub fn vehicle_price(&self) -> Money {
        self.vehicle_cost.unwrap_or(self.ex_showroom_price)
    }

    pub fn tenure_months(&self) -> u32 {
        self.tenure_years * 12
    }

    pub fn down_payment_rate(&self) -> Rate {
        self.down_payment_percent
            .map(Rate::from_percent)
            .unwrap_or(Rate::ZERO)
    }

    /// check the input against its vehicle before any calculation
    ///
    /// the calculation engine assumes this has passed and does no clamping of its own
    pub fn validate(&self, vehicle: &Vehicle) -> Result<()> {
        if self.company_name.trim().is_empty() {
            return Err(CostSheetError::validation("company_name", "must not be empty"));
        }

        if self.vehicle_id != vehicle.id {
            return Err(CostSheetError::validation(
                "vehicle_id",
                format!("input references {}, got vehicle {}", self.vehicle_id, vehicle.id),
            ));
        }
        if !vehicle.is_active {
            return Err(CostSheetError::validation(
                "vehicle_id",
                format!("vehicle {} is inactive", vehicle.display_name()),
            ));
        }
        vehicle.validate()?;

        if !(MIN_TENURE_YEARS..=MAX_TENURE_YEARS).contains(&self.tenure_years) {
            return Err(CostSheetError::validation(
                "tenure_years",
                format!(
                    "must be within {}..={}, got {}",
                    MIN_TENURE_YEARS, MAX_TENURE_YEARS, self.tenure_years
                ),
            ));
        }

        if !self.ex_showroom_price.is_positive() {
            return Err(CostSheetError::validation(
                "ex_showroom_price",
                format!("must be greater than zero, got {}", self.ex_showroom_price),
            ));
        }
        if let Some(cost) = self.vehicle_cost {
            if !cost.is_positive() {
                return Err(CostSheetError::validation(
                    "vehicle_cost",
                    format!("must be greater than zero, got {}", cost),
                ));
            }
        }

        if let Some(percent) = self.down_payment_percent {
            ensure_percent("down_payment_percent", percent)?;
        }

        ensure_non_negative("registration_charges", self.registration_charges)?;

        if self.usage.distance_per_month < Decimal::ZERO {
            return Err(CostSheetError::validation(
                "usage.distance_per_month",
                format!("must not be negative, got {}", self.usage.distance_per_month),
            ));
        }
        if self.usage.daily_hours < Decimal::ZERO
            || self.usage.daily_hours > Decimal::from(MAX_DAILY_HOURS)
        {
            return Err(CostSheetError::validation(
                "usage.daily_hours",
                format!("must be within 0..={}, got {}", MAX_DAILY_HOURS, self.usage.daily_hours),
            ));
        }

        ensure_non_negative("drivers.salary_per_driver", self.drivers.salary_per_driver)?;
        ensure_non_negative("add_ons.parking", self.add_ons.parking)?;
        ensure_non_negative("add_ons.supervisor", self.add_ons.supervisor)?;
        ensure_non_negative("add_ons.gps", self.add_ons.gps)?;
        ensure_non_negative("add_ons.permit", self.add_ons.permit)?;
        if let Some(maintenance) = self.add_ons.maintenance {
            ensure_non_negative("add_ons.maintenance", maintenance)?;
        }

        Ok(())
    }
}

fn ensure_non_negative(field: &str, amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(CostSheetError::validation(
            field,
            format!("must not be negative, got {}", amount),
        ));
    }
    Ok(())
}

fn ensure_percent(field: &str, percent: Decimal) -> Result<()> {
    if percent < Decimal::ZERO || percent > Decimal::from(100) {
        return Err(CostSheetError::validation(
            field,
            format!("must be within 0..=100, got {}", percent),
        ));
    }
    Ok(())
}
