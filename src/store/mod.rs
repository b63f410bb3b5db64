pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cost_sheet::CostSheet;
use crate::errors::Result;
use crate::rates::{NewRate, RateRecord};
use crate::types::{CostSheetId, CostSheetStatus, RateKey, RateKind, UserId, VehicleId};
use crate::vehicle::Vehicle;

/// rate persistence
pub trait RateStore {
    /// insert `rate` and make it the only flagged record for its key, atomically
    fn activate_rate(&self, rate: NewRate, now: DateTime<Utc>) -> Result<RateRecord>;

    /// every record ever stored, active or not
    fn rate_records(&self) -> Result<Vec<RateRecord>>;

    fn rate_history(&self, kind: RateKind, key: &RateKey) -> Result<Vec<RateRecord>>;

    /// the record of a series in effect on `day`
    fn active_rate(
        &self,
        kind: RateKind,
        key: &RateKey,
        day: NaiveDate,
    ) -> Result<Option<RateRecord>>;
}

/// vehicle master persistence
pub trait VehicleStore {
    fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<()>;

    fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>>;

    fn vehicles(&self) -> Result<Vec<Vehicle>>;

    /// toggle availability for new sheets; existing sheets keep their reference
    fn set_vehicle_active(&self, id: VehicleId, active: bool) -> Result<Vehicle>;
}

/// cost sheet persistence with optimistic concurrency
pub trait CostSheetStore {
    fn insert_cost_sheet(&self, sheet: &CostSheet) -> Result<()>;

    fn cost_sheet(&self, id: CostSheetId) -> Result<Option<CostSheet>>;

    /// replace the stored sheet only if its version still equals `expected_version`
    fn update_cost_sheet(&self, sheet: &CostSheet, expected_version: u64) -> Result<()>;

    /// matching sheets, most recently updated first
    fn list_cost_sheets(&self, filter: &CostSheetFilter) -> Result<Vec<CostSheet>>;
}

/// everything the service needs from persistence
pub trait Store: RateStore + VehicleStore + CostSheetStore {}

impl<T: RateStore + VehicleStore + CostSheetStore> Store for T {}

impl<T: RateStore + ?Sized> RateStore for &T {
    fn activate_rate(&self, rate: NewRate, now: DateTime<Utc>) -> Result<RateRecord> {
        (**self).activate_rate(rate, now)
    }

    fn rate_records(&self) -> Result<Vec<RateRecord>> {
        (**self).rate_records()
    }

    fn rate_history(&self, kind: RateKind, key: &RateKey) -> Result<Vec<RateRecord>> {
        (**self).rate_history(kind, key)
    }

    fn active_rate(
        &self,
        kind: RateKind,
        key: &RateKey,
        day: NaiveDate,
    ) -> Result<Option<RateRecord>> {
        (**self).active_rate(kind, key, day)
    }
}

impl<T: VehicleStore + ?Sized> VehicleStore for &T {
    fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        (**self).insert_vehicle(vehicle)
    }

    fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        (**self).vehicle(id)
    }

    fn vehicles(&self) -> Result<Vec<Vehicle>> {
        (**self).vehicles()
    }

    fn set_vehicle_active(&self, id: VehicleId, active: bool) -> Result<Vehicle> {
        (**self).set_vehicle_active(id, active)
    }
}

impl<T: CostSheetStore + ?Sized> CostSheetStore for &T {
    fn insert_cost_sheet(&self, sheet: &CostSheet) -> Result<()> {
        (**self).insert_cost_sheet(sheet)
    }

    fn cost_sheet(&self, id: CostSheetId) -> Result<Option<CostSheet>> {
        (**self).cost_sheet(id)
    }

    fn update_cost_sheet(&self, sheet: &CostSheet, expected_version: u64) -> Result<()> {
        (**self).update_cost_sheet(sheet, expected_version)
    }

    fn list_cost_sheets(&self, filter: &CostSheetFilter) -> Result<Vec<CostSheet>> {
        (**self).list_cost_sheets(filter)
    }
}

/// listing filter; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSheetFilter {
    pub status: Option<CostSheetStatus>,
    pub created_by: Option<UserId>,
}

impl CostSheetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: CostSheetStatus) -> Self {
        Self {
            status: Some(status),
            created_by: None,
        }
    }

    pub fn created_by(mut self, user: impl Into<UserId>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    pub fn matches(&self, sheet: &CostSheet) -> bool {
        self.status.map_or(true, |status| sheet.status == status)
            && self
                .created_by
                .as_deref()
                .map_or(true, |user| sheet.is_created_by(user))
    }
}
