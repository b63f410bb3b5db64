use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{CostSheetError, Result};
use crate::types::{FuelType, VehicleId};

/// vehicle master record
///
/// cost sheets reference vehicles by id, so a vehicle in use should only change for
/// administrative correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub brand: String,
    pub model: String,
    pub variant: String,
    pub fuel_type: FuelType,
    /// distance per fuel unit (km/l, km/kWh)
    pub mileage_per_unit: Decimal,
    pub maintenance_cost_per_distance: Money,
    pub is_active: bool,
}

impl Vehicle {
    /// create an active vehicle
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        variant: impl Into<String>,
        fuel_type: FuelType,
        mileage_per_unit: Decimal,
        maintenance_cost_per_distance: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            brand: brand.into(),
            model: model.into(),
            variant: variant.into(),
            fuel_type,
            mileage_per_unit,
            maintenance_cost_per_distance,
            is_active: true,
        }
    }

    /// "brand model variant"
    pub fn display_name(&self) -> String {
        [self.brand.as_str(), self.model.as_str(), self.variant.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// check master data before it is stored or used
    pub fn validate(&self) -> Result<()> {
        if self.brand.trim().is_empty() {
            return Err(CostSheetError::validation("vehicle.brand", "must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(CostSheetError::validation("vehicle.model", "must not be empty"));
        }
        if self.mileage_per_unit <= Decimal::ZERO {
            return Err(CostSheetError::validation(
                "vehicle.mileage_per_unit",
                format!("must be greater than zero, got {}", self.mileage_per_unit),
            ));
        }
        if self.maintenance_cost_per_distance.is_negative() {
            return Err(CostSheetError::validation(
                "vehicle.maintenance_cost_per_distance",
                format!("must not be negative, got {}", self.maintenance_cost_per_distance),
            ));
        }
        Ok(())
    }
}
