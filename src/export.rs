/// read-only snapshots of approved sheets for document rendering
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost_sheet::CostSheet;
use crate::decimal::{Money, Rate};
use crate::errors::{CostSheetError, Result};
use crate::types::{CostSheetId, CostSheetStatus, FuelType, UserId};
use crate::vehicle::Vehicle;

/// client-facing quotation; every money figure is rounded to 2 dp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedQuotation {
    pub cost_sheet_id: CostSheetId,
    pub company_name: String,
    pub city: Option<String>,
    pub vehicle: VehicleView,
    pub tenure_months: u32,
    pub financing: FinancingView,
    pub operations: OperationsView,
    pub rates: RatesView,
    pub admin_charge_amount: Money,
    pub grand_total: Money,
    /// grand total per distance unit, absent when no usage was quoted
    pub cost_per_distance: Option<Money>,
    pub approved_by: UserId,
    pub approved_at: DateTime<Utc>,
    pub approval_remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleView {
    pub name: String,
    pub fuel_type: FuelType,
    pub mileage_per_unit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingView {
    pub vehicle_price: Money,
    pub registration_charges: Money,
    pub insurance_amount_annual: Money,
    pub on_road_price: Money,
    pub down_payment_amount: Money,
    pub loan_amount: Money,
    pub emi: Money,
    pub subtotal_a: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsView {
    pub distance_per_month: Decimal,
    pub fuel_cost: Money,
    pub maintenance_cost: Money,
    pub driver_count: u32,
    pub total_driver_cost: Money,
    pub add_ons: Money,
    pub subtotal_b: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesView {
    pub interest: Rate,
    pub insurance: Rate,
    pub admin_charge: Rate,
    pub fuel_price: Money,
}

impl ApprovedQuotation {
    /// snapshot an approved sheet; any other status is refused
    pub fn from_sheet(sheet: &CostSheet, vehicle: &Vehicle) -> Result<Self> {
        if sheet.status != CostSheetStatus::Approved {
            return Err(CostSheetError::NotApproved { status: sheet.status });
        }

        let approved_by = sheet
            .approved_by
            .clone()
            .ok_or_else(|| {
                CostSheetError::validation("approved_by", "approved sheet has no approver")
            })?;
        let approved_at = sheet
            .approved_at
            .ok_or_else(|| {
                CostSheetError::validation("approved_at", "approved sheet has no approval time")
            })?;

        let input = &sheet.input;
        let derived = &sheet.derived;
        let distance = input.usage.distance_per_month;
        let cost_per_distance = if distance > Decimal::ZERO {
            Some((derived.grand_total / distance).to_presentation())
        } else {
            None
        };

        Ok(Self {
            cost_sheet_id: sheet.id,
            company_name: input.company_name.clone(),
            city: input.city.clone(),
            vehicle: VehicleView {
                name: vehicle.display_name(),
                fuel_type: vehicle.fuel_type,
                mileage_per_unit: vehicle.mileage_per_unit,
            },
            tenure_months: derived.tenure_months,
            financing: FinancingView {
                vehicle_price: derived.vehicle_price.to_presentation(),
                registration_charges: input.registration_charges.to_presentation(),
                insurance_amount_annual: derived.insurance_amount_annual.to_presentation(),
                on_road_price: derived.on_road_price.to_presentation(),
                down_payment_amount: derived.down_payment_amount.to_presentation(),
                loan_amount: derived.loan_amount.to_presentation(),
                emi: derived.emi.to_presentation(),
                subtotal_a: derived.subtotal_a.to_presentation(),
            },
            operations: OperationsView {
                distance_per_month: distance,
                fuel_cost: derived.fuel_cost.to_presentation(),
                maintenance_cost: derived.maintenance_cost.to_presentation(),
                driver_count: input.drivers.count,
                total_driver_cost: derived.total_driver_cost.to_presentation(),
                add_ons: input.add_ons.fixed_total().to_presentation(),
                subtotal_b: derived.subtotal_b.to_presentation(),
            },
            rates: RatesView {
                interest: sheet.rates.interest,
                insurance: sheet.rates.insurance,
                admin_charge: sheet.rates.admin_charge,
                fuel_price: sheet.rates.fuel_rate_for(vehicle.fuel_type),
            },
            admin_charge_amount: derived.admin_charge_amount.to_presentation(),
            grand_total: derived.grand_total.to_presentation(),
            cost_per_distance,
            approved_by,
            approved_at,
            approval_remarks: sheet.approval_remarks.clone(),
        })
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CostSheetError::CalculationError {
            message: format!("quotation serialization failed: {}", e),
        })
    }
}

/// renders a quotation into a client document (pdf, json, ...)
pub trait DocumentExporter {
    type Output;

    fn export(&self, quotation: &ApprovedQuotation) -> Result<Self::Output>;
}

/// exporter producing the quotation as pretty json
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExporter;

impl DocumentExporter for JsonExporter {
    type Output = String;

    fn export(&self, quotation: &ApprovedQuotation) -> Result<String> {
        quotation.to_json_pretty()
    }
}
