use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a cost sheet
pub type CostSheetId = Uuid;

/// unique identifier for a vehicle
pub type VehicleId = Uuid;

/// unique identifier for a rate record
pub type RateId = Uuid;

/// identifier of a user as issued by the external session layer
pub type UserId = String;

/// fuel (or energy) type of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Petrol,
    Diesel,
    Hybrid,
    /// priced per kWh, mileage in distance per kWh
    Ev,
}

impl FuelType {
    pub const ALL: [FuelType; 4] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Hybrid,
        FuelType::Ev,
    ];
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FuelType::Petrol => "PETROL",
            FuelType::Diesel => "DIESEL",
            FuelType::Hybrid => "HYBRID",
            FuelType::Ev => "EV",
        };
        f.write_str(name)
    }
}

/// cost sheet workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostSheetStatus {
    /// being prepared, freely editable by its creator
    Draft,
    /// submitted and waiting on an approver
    PendingApproval,
    /// approved; immutable from here on
    Approved,
    /// rejected with remarks; can be edited back into a draft
    Rejected,
}

impl CostSheetStatus {
    /// approved sheets never leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, CostSheetStatus::Approved)
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, CostSheetStatus::Draft | CostSheetStatus::Rejected)
    }
}

impl fmt::Display for CostSheetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CostSheetStatus::Draft => "DRAFT",
            CostSheetStatus::PendingApproval => "PENDING_APPROVAL",
            CostSheetStatus::Approved => "APPROVED",
            CostSheetStatus::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

/// time-varying rate kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    /// annual interest percent used for the EMI
    Interest,
    /// annual insurance percent of the insured value
    Insurance,
    /// admin charge percent on subtotal a + b
    AdminCharge,
    /// price per fuel unit (litre, kWh)
    Fuel,
}

impl RateKind {
    /// percent kinds must stay within 0..=100
    pub fn is_percentage(&self) -> bool {
        !matches!(self, RateKind::Fuel)
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RateKind::Interest => "interest",
            RateKind::Insurance => "insurance",
            RateKind::AdminCharge => "admin_charge",
            RateKind::Fuel => "fuel",
        };
        f.write_str(name)
    }
}

/// disambiguating key for a rate; only fuel rates carry a fuel type or city
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct RateKey {
    pub fuel_type: Option<FuelType>,
    pub city: Option<String>,
}

impl RateKey {
    /// key for the single interest / insurance / admin-charge series
    pub fn global() -> Self {
        Self::default()
    }

    pub fn fuel(fuel_type: FuelType) -> Self {
        Self {
            fuel_type: Some(fuel_type),
            city: None,
        }
    }

    pub fn fuel_in_city(fuel_type: FuelType, city: impl Into<String>) -> Self {
        Self {
            fuel_type: Some(fuel_type),
            city: Some(city.into()),
        }
    }

    /// the same key without the city
    pub fn without_city(&self) -> Self {
        Self {
            fuel_type: self.fuel_type,
            city: None,
        }
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.fuel_type, &self.city) {
            (None, None) => f.write_str("*"),
            (Some(fuel), None) => write!(f, "{}", fuel),
            (None, Some(city)) => write!(f, "@{}", city),
            (Some(fuel), Some(city)) => write!(f, "{}@{}", fuel, city),
        }
    }
}

/// user roles known to the approval workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// prepares cost sheets
    Staff,
    Admin,
    SuperAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Staff => "staff",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        };
        f.write_str(name)
    }
}

/// workflow capability granted to a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// submit a sheet someone else created
    Submit,
    /// approve or reject pending sheets
    Approve,
    /// edit a sheet someone else created
    EditAny,
    /// add and activate rate records
    ManageRates,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Submit => "submit",
            Capability::Approve => "approve",
            Capability::EditAny => "edit_any",
            Capability::ManageRates => "manage_rates",
        };
        f.write_str(name)
    }
}
